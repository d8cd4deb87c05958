//! Outbound dispatch to the Graph API.
//!
//! ```text
//! Action → build_request() → Transport::send() → interpret_response() → Result<Value, DispatchError>
//! ```
//!
//! One call per dispatch, no retries. Failures go back to the caller.

pub mod request;
pub mod transport;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::action::{Action, UserId, OUTBOUND_TAGS};
use crate::config::Credentials;
use crate::error::{DispatchError, PlatformError, TransportError};

pub use request::{build_profile_request, build_request, OutboundRequest, PROFILE_FIELDS};
pub use transport::{HttpTransport, Transport, TransportResponse};

/// Public profile of a page-scoped user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// UTC offset in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_payment_enabled: Option<bool>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Turns outbound actions into Graph API calls.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    credentials: Arc<Credentials>,
    api_base: String,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<Credentials>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            credentials,
            api_base: api_base.into(),
        }
    }

    /// Send an outbound action and return the parsed response body.
    ///
    /// Inbound tags fail with [`DispatchError::UnknownAction`] without
    /// touching the network.
    pub async fn dispatch(&self, action: &Action) -> Result<Value, DispatchError> {
        let request = build_request(action, &self.api_base, self.access_token())?;

        debug!(
            action = action.tag(),
            method = %request.method,
            path = request.url.path(),
            "dispatch_request"
        );

        self.send(action.tag(), request).await
    }

    /// Dispatch a loosely typed `{ "type": ..., ... }` action.
    pub async fn dispatch_value(&self, action: Value) -> Result<Value, DispatchError> {
        let tag = action
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !OUTBOUND_TAGS.contains(&tag.as_str()) {
            warn!(action = %tag, "dispatch_unknown_action");
            return Err(DispatchError::UnknownAction { tag });
        }

        let action: Action = serde_json::from_value(action).map_err(DispatchError::InvalidAction)?;
        self.dispatch(&action).await
    }

    /// Dispatch several actions concurrently.
    ///
    /// Results line up with `actions`; the calls themselves may complete in
    /// any order.
    pub async fn dispatch_all(&self, actions: &[Action]) -> Vec<Result<Value, DispatchError>> {
        futures::future::join_all(actions.iter().map(|action| self.dispatch(action))).await
    }

    /// Look up first name, last name, picture and the like for a user.
    pub async fn get_user_profile(&self, user_id: &UserId) -> Result<UserProfile, DispatchError> {
        let request = build_profile_request(user_id, &self.api_base, self.access_token())?;
        let body = self.send("USER_PROFILE", request).await?;

        serde_json::from_value(body).map_err(|e| {
            DispatchError::Transport(TransportError::InvalidResponse(format!(
                "unexpected profile shape: {}",
                e
            )))
        })
    }

    fn access_token(&self) -> Option<&str> {
        self.credentials.page_access_token.as_deref()
    }

    async fn send(&self, label: &str, request: OutboundRequest) -> Result<Value, DispatchError> {
        let response = self.transport.send(request).await.map_err(|e| {
            warn!(action = label, error = %e, "dispatch_transport_error");
            DispatchError::Transport(e)
        })?;

        interpret_response(response).map_err(|e| {
            if let DispatchError::Platform(platform) = &e {
                warn!(
                    action = label,
                    code = ?platform.code(),
                    message = ?platform.message(),
                    "dispatch_platform_error"
                );
            }
            e
        })
    }
}

/// Classify a transport response.
///
/// A truthy `error` field in the body is a platform failure whatever the
/// status; otherwise a non-2xx status is a transport failure and a 2xx body
/// is the success value. `null`, `false`, `0` and `""` do not count as errors.
pub fn interpret_response(response: TransportResponse) -> Result<Value, DispatchError> {
    let TransportResponse { status, body } = response;

    if let Some(error) = body.get("error").filter(|e| is_truthy(e)) {
        return Err(DispatchError::Platform(PlatformError(error.clone())));
    }

    if !(200..300).contains(&status) {
        return Err(TransportError::Status { status, body }.into());
    }

    Ok(body)
}

/// JSON truthiness: empty objects and arrays count as present.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
