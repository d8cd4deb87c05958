//! Webhook endpoint handlers.
//!
//! Every POST is answered with 200 and an empty body, including deliveries
//! that fail verification; failures are only visible in the logs.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::WebhookError;
use crate::webhook::{HANDSHAKE_REJECTED, SIGNATURE_HEADER};
use crate::Messenger;

const JSON_CONTENT_TYPE: [(header::HeaderName, &str); 1] =
    [(header::CONTENT_TYPE, "application/json")];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub messenger: Messenger,
}

impl AppState {
    pub fn new(messenger: Messenger) -> Self {
        Self { messenger }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Subscription Handshake
// =============================================================================

/// Query parameters of the GET handshake.
#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    #[serde(default, rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(default, rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(default, rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET handshake: echo `hub.challenge` when `hub.verify_token` matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<HandshakeQuery>,
) -> impl IntoResponse {
    info!(
        mode = ?query.mode,
        has_verify_token = query.verify_token.is_some(),
        "webhook_handshake_received"
    );

    let body = match state
        .messenger
        .verify_handshake(query.verify_token.as_deref(), query.challenge.as_deref())
    {
        Some(challenge) => {
            info!("webhook_handshake_accepted");
            challenge.to_string()
        }
        None => HANDSHAKE_REJECTED.to_string(),
    };

    (StatusCode::OK, JSON_CONTENT_TYPE, body)
}

// =============================================================================
// Event Delivery
// =============================================================================

/// POST delivery: verify, classify and fan out.
///
/// `Bytes` buffers the complete body before the handler runs, so the
/// signature is always checked against the whole payload.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "webhook_received"
    );

    match state.messenger.handle_webhook(&body, signature) {
        Ok(actions) => {
            info!(actions, "webhook_processed");
        }
        Err(e @ WebhookError::Configuration(_)) => {
            error!(error = %e, "webhook_rejected_configuration");
        }
        Err(e @ WebhookError::Integrity) => {
            error!(error = %e, "webhook_rejected_integrity");
        }
        Err(e @ WebhookError::SourceMismatch { .. }) => {
            error!(error = %e, "webhook_rejected_source");
        }
        Err(e @ WebhookError::MalformedPayload(_)) => {
            warn!(error = %e, "webhook_rejected_malformed");
        }
    }

    (StatusCode::OK, JSON_CONTENT_TYPE)
}
