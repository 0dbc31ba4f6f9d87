// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! The OAuth client credentials are read once at startup; endpoint URLs
//! default to the Oura cloud but can be overridden, which the integration
//! tests rely on.

use std::env;

/// Default port for the loopback OAuth callback listener.
const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Oura OAuth client ID (public)
    pub client_id: String,
    /// Oura OAuth client secret
    pub client_secret: String,

    /// Authorization endpoint (user-facing, opened in the browser)
    pub authorize_url: String,
    /// Token endpoint (code exchange and refresh)
    pub token_url: String,
    /// API base URL for the daily score collections
    pub api_base: String,

    /// Local port the one-shot callback listener binds to
    pub callback_port: u16,
    /// Whether to open the authorization URL in the default browser.
    /// Disabled in headless environments and tests.
    pub open_browser: bool,

    /// Timeout applied to every outbound HTTP request, in seconds
    pub http_timeout_secs: u64,
    /// How long the callback listener waits for the browser redirect,
    /// in seconds
    pub listener_timeout_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            authorize_url: "https://cloud.ouraring.com/oauth/authorize".to_string(),
            token_url: "https://api.ouraring.com/oauth/token".to_string(),
            api_base: "https://api.ouraring.com/v2/usercollection".to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            open_browser: false,
            http_timeout_secs: 30,
            listener_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            client_id: env::var("OURA_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("OURA_CLIENT_ID"))?,
            client_secret: env::var("OURA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OURA_CLIENT_SECRET"))?,

            authorize_url: env::var("OURA_AUTHORIZE_URL")
                .unwrap_or_else(|_| "https://cloud.ouraring.com/oauth/authorize".to_string()),
            token_url: env::var("OURA_TOKEN_URL")
                .unwrap_or_else(|_| "https://api.ouraring.com/oauth/token".to_string()),
            api_base: env::var("OURA_API_BASE")
                .unwrap_or_else(|_| "https://api.ouraring.com/v2/usercollection".to_string()),

            callback_port: env::var("OURA_CALLBACK_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CALLBACK_PORT),
            open_browser: env::var("OURA_OPEN_BROWSER")
                .map(|v| v != "0" && v != "false")
                .unwrap_or(true),

            http_timeout_secs: env::var("OURA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            listener_timeout_secs: env::var("OURA_LISTENER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        })
    }

    /// The fixed local redirect URI registered with the OAuth provider.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.callback_port)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
