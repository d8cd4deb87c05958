//! Messenger Web Server - webhook receiver for a Facebook page.
//!
//! This binary:
//! - Answers the webhook subscription handshake
//! - Verifies and classifies incoming deliveries
//! - Logs every classified action
//! - Optionally echoes text messages back (`ECHO_TEXT_MESSAGES=true`)

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use messenger::web::{router, WEBHOOK_PATH};
use messenger::{Action, AppState, Config, Messenger, SenderAction, UserId};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        page_token_configured = config.page_access_token.is_some(),
        app_secret_configured = config.app_secret.is_some(),
        verify_token_configured = config.verify_token.is_some(),
        graph_api_base = %config.graph_api_base,
        echo_text_messages = config.echo_text_messages,
        "config_loaded"
    );

    if config.app_secret.is_none() {
        warn!("app_secret_missing_all_deliveries_will_be_rejected");
    }

    let messenger = Messenger::from_config(&config).context("Failed to build HTTP client")?;

    // Kept for the lifetime of the server
    let _log_subscription = messenger.subscribe(|action| {
        info!(
            action = action.tag(),
            sender = ?action.sender().map(ToString::to_string),
            "action_received"
        );
        Ok(())
    });

    let _echo_subscription = config.echo_text_messages.then(|| {
        let outbound = messenger.clone();
        messenger.subscribe(move |action| {
            if let Action::Text { sender, text: Some(text) } = action {
                let outbound = outbound.clone();
                tokio::spawn(async move { echo(&outbound, sender, text).await });
            }
            Ok(())
        })
    });

    let app = router(AppState::new(messenger));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, path = WEBHOOK_PATH, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Show a typing indicator, then send the text back.
async fn echo(messenger: &Messenger, recipient: UserId, text: String) {
    let typing = Action::sender_action(recipient.clone(), SenderAction::TypingOn);
    if let Err(e) = messenger.dispatch(&typing).await {
        warn!(recipient = %recipient, error = %e, "echo_typing_failed");
    }

    match messenger.dispatch(&Action::text_message(recipient.clone(), text)).await {
        Ok(_) => info!(recipient = %recipient, "echo_sent"),
        Err(e) => warn!(recipient = %recipient, error = %e, "echo_failed"),
    }
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
