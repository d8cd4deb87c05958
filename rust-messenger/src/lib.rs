//! Messenger webhook adapter.
//!
//! Receives signed webhook deliveries from the Messenger Platform, turns
//! them into normalized [`Action`]s for subscribers, and sends outbound
//! actions back through the Graph API.
//!
//! ## Architecture
//!
//! ```text
//! POST /webhook → verify signature → classify → Subscribers::fan_out → listeners
//! caller → Action → Dispatcher → Transport (HTTPS) → Result<Value, DispatchError>
//! ```
//!
//! Currently optin, message read, delivery confirmation and account linking
//! events are not supported; they are dropped during classification.

pub mod action;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod messenger;
pub mod subscribers;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use action::{Action, Coordinates, SenderAction, UserId};
pub use config::{Config, Credentials};
pub use dispatch::{Dispatcher, HttpTransport, OutboundRequest, Transport, UserProfile};
pub use error::{DispatchError, PlatformError, TransportError, WebhookError};
pub use messenger::Messenger;
pub use subscribers::{Subscribers, Subscription};
pub use web::AppState;
