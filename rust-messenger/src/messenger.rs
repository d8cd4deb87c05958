//! The adapter as one handle: webhook intake, subscriptions and dispatch.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::action::{Action, UserId};
use crate::config::{Config, Credentials};
use crate::dispatch::{Dispatcher, HttpTransport, Transport, UserProfile};
use crate::error::{DispatchError, TransportError, WebhookError};
use crate::subscribers::{Subscribers, Subscription};
use crate::webhook::{classify_envelope, verify_handshake, verify_signature, Envelope};

/// Cheap to clone; clones share credentials, listeners and HTTP client.
#[derive(Clone)]
pub struct Messenger {
    credentials: Arc<Credentials>,
    subscribers: Subscribers,
    dispatcher: Dispatcher,
}

impl Messenger {
    /// Build a messenger that talks to the Graph API over HTTPS.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(Duration::from_millis(config.request_timeout_ms))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a messenger on top of a custom transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let credentials = config.credentials();
        let dispatcher = Dispatcher::new(
            transport,
            Arc::clone(&credentials),
            config.graph_api_base.clone(),
        );

        Self {
            credentials,
            subscribers: Subscribers::new(),
            dispatcher,
        }
    }

    /// Register a listener for inbound actions.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Action) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    /// Verify, parse and classify one POST delivery, then fan out the
    /// resulting actions in encounter order.
    ///
    /// `body` must be the complete raw request body. Returns the number of
    /// actions delivered.
    pub fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> Result<usize, WebhookError> {
        verify_signature(self.credentials.app_secret.as_deref(), body, signature)?;

        let envelope: Envelope = serde_json::from_slice(body)?;
        let actions = classify_envelope(&envelope)?;

        debug!(
            entries = envelope.entry.len(),
            events = envelope.event_count(),
            actions = actions.len(),
            "webhook_classified"
        );

        for action in &actions {
            self.subscribers.fan_out(action);
        }

        info!(actions = actions.len(), listeners = self.subscribers.len(), "webhook_delivered");

        Ok(actions.len())
    }

    /// Answer the GET handshake; `Some(challenge)` when the token matches.
    pub fn verify_handshake<'a>(
        &self,
        provided_token: Option<&str>,
        challenge: Option<&'a str>,
    ) -> Option<&'a str> {
        verify_handshake(self.credentials.verify_token.as_deref(), provided_token, challenge)
    }

    pub async fn dispatch(&self, action: &Action) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch(action).await
    }

    pub async fn dispatch_value(&self, action: Value) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch_value(action).await
    }

    pub async fn dispatch_all(&self, actions: &[Action]) -> Vec<Result<Value, DispatchError>> {
        self.dispatcher.dispatch_all(actions).await
    }

    pub async fn get_user_profile(&self, user_id: &UserId) -> Result<UserProfile, DispatchError> {
        self.dispatcher.get_user_profile(user_id).await
    }
}
