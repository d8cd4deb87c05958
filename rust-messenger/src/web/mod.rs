//! Web server module for the Messenger webhook.
//!
//! - `GET  /webhook` answers the subscription handshake
//! - `POST /webhook` receives signed event deliveries
//! - `GET  /health` for load balancers

pub mod handlers;

use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, receive_webhook, verify_webhook, AppState, HandshakeQuery, HealthResponse,
};

/// Path the platform is configured to call.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Build the router shared by the server binary and the HTTP tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, get(verify_webhook).post(receive_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
