//! The network seam of the dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::request::OutboundRequest;
use crate::error::TransportError;

/// Status and decoded JSON body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// `Value::Null` for an empty body.
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends JSON over HTTPS and returns JSON.
///
/// Implementations must not interpret the body; the dispatcher decides what
/// counts as a platform failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("messenger-webhook/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let OutboundRequest {
            method,
            url,
            query,
            body,
        } = request;

        tracing::debug!(
            method = %method,
            path = url.path(),
            has_body = body.is_some(),
            "graph_request_starting"
        );

        let mut builder = self.client.request(method.clone(), url.clone()).query(&query);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    tracing::error!(method = %method, path = url.path(), error = %e, "graph_request_timeout");
                } else {
                    tracing::error!(method = %method, path = url.path(), error = %e, "graph_request_error");
                }
                return Err(e.into());
            }
        };

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                TransportError::InvalidResponse(format!("body is not JSON (status {}): {}", status, e))
            })?
        };

        tracing::debug!(
            method = %method,
            path = url.path(),
            status_code = status,
            "graph_request_complete"
        );

        Ok(TransportResponse { status, body })
    }
}
