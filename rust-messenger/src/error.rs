//! Error types for the webhook and dispatch paths.

use serde_json::Value;
use thiserror::Error;

/// Failures on the inbound path. All of them are terminal for the request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A credential the operation needs is not configured
    #[error("Configuration error: {0}")]
    Configuration(&'static str),

    /// The `x-hub-signature` header does not match the body
    #[error("Message integrity check failed")]
    Integrity,

    /// The envelope did not come from a page subscription
    #[error("Message not sent from page (object = {object:?})")]
    SourceMismatch { object: String },

    /// The body passed verification but is not a valid envelope
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Failures of an outbound dispatch, returned to the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A credential or setting the call needs is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The action tag has no outbound mapping
    #[error("Messenger dispatch action unknown: {tag}")]
    UnknownAction { tag: String },

    /// The tag is known but the fields don't fit it
    #[error("Invalid action: {0}")]
    InvalidAction(serde_json::Error),

    /// The platform answered with an `error` object
    #[error("Platform error: {0}")]
    Platform(PlatformError),

    /// The call itself failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// The platform's error object, when the failure carries one.
    pub fn platform_error(&self) -> Option<&PlatformError> {
        match self {
            DispatchError::Platform(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised by a [`Transport`](crate::dispatch::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a platform error object in the body
    #[error("Unexpected HTTP status {status}")]
    Status { status: u16, body: Value },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The `error` object of a Graph API response, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformError(pub Value);

impl PlatformError {
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }

    pub fn code(&self) -> Option<i64> {
        self.0.get("code").and_then(Value::as_i64)
    }

    pub fn error_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.message(), self.code()) {
            (Some(message), Some(code)) => write!(f, "{} (code {})", message, code),
            (Some(message), None) => f.write_str(message),
            _ => write!(f, "{}", self.0),
        }
    }
}
