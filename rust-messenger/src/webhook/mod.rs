//! Inbound webhook processing.
//!
//! ```text
//! raw body + x-hub-signature → verify_signature() → Envelope → classify_envelope() → [Action]
//! ```
//!
//! Parsing only happens after the signature over the exact body bytes has
//! been checked.

pub mod classifier;
pub mod envelope;
pub mod signature;

pub use classifier::{classify_envelope, classify_event, classify_raw_event, Classification};
pub use envelope::{Envelope, MessagingEvent, PAGE_OBJECT};
pub use signature::{
    sign_payload, verify_handshake, verify_signature, HANDSHAKE_REJECTED, SIGNATURE_HEADER,
};
