//! Configuration module for environment variable parsing.
//!
//! The three platform credentials are optional: a missing credential only
//! disables the operations that need it, it never stops the process from
//! starting.

use std::env;
use std::sync::Arc;
use tracing::warn;

/// Default Graph API base used for all outbound calls.
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v2.6";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page access token sent with every outbound call
    pub page_access_token: Option<String>,

    /// App secret used as the HMAC key for `x-hub-signature`
    pub app_secret: Option<String>,

    /// Verify token for the GET subscription handshake
    pub verify_token: Option<String>,

    /// Base URL of the Graph API (no trailing slash)
    pub graph_api_base: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Web Server Configuration
    // =========================================================================

    /// Port for the web server to listen on
    pub port: u16,

    /// Reply to every received text with the same text
    pub echo_text_messages: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            page_access_token: parse_secret("FB_PAGE_TOKEN"),

            app_secret: parse_secret("FB_APP_SECRET"),

            verify_token: parse_secret("FB_VERIFY_TOKEN"),

            graph_api_base: env::var("GRAPH_API_BASE")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", 10_000),

            port: parse_number("PORT", 8080),

            echo_text_messages: parse_flag("ECHO_TEXT_MESSAGES"),
        }
    }

    /// Split out the immutable credential set shared by the verifier and dispatcher.
    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::new(Credentials {
            page_access_token: self.page_access_token.clone(),
            app_secret: self.app_secret.clone(),
            verify_token: self.verify_token.clone(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_access_token: None,
            app_secret: None,
            verify_token: None,
            graph_api_base: DEFAULT_GRAPH_API_BASE.to_string(),
            request_timeout_ms: 10_000,
            port: 8080,
            echo_text_messages: false,
        }
    }
}

/// Platform credentials, fixed at construction.
#[derive(Clone, Default)]
pub struct Credentials {
    pub page_access_token: Option<String>,
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,
}

impl Credentials {
    pub fn new(
        page_access_token: impl Into<String>,
        app_secret: impl Into<String>,
        verify_token: impl Into<String>,
    ) -> Self {
        Self {
            page_access_token: non_blank(page_access_token.into()),
            app_secret: non_blank(app_secret.into()),
            verify_token: non_blank(verify_token.into()),
        }
    }
}

// Hand-written so secrets never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("page_access_token_set", &self.page_access_token.is_some())
            .field("app_secret_set", &self.app_secret.is_some())
            .field("verify_token_set", &self.verify_token.is_some())
            .finish()
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Read a credential, treating blank values as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name).ok().and_then(non_blank)
}

/// Parse a numeric variable, falling back to `default` on absence or garbage.
fn parse_number<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid number, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
