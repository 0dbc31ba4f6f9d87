// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests.

use chrono::Utc;
use oura_tracker::{config::Config, models::Credentials};

/// Config pointed at a mock server, with browser launching disabled.
#[allow(dead_code)]
pub fn test_config(server_url: &str, callback_port: u16) -> Config {
    Config {
        client_id: "test_client_id".to_string(),
        client_secret: "test_secret".to_string(),
        authorize_url: format!("{}/oauth/authorize", server_url),
        token_url: format!("{}/oauth/token", server_url),
        api_base: server_url.to_string(),
        callback_port,
        open_browser: false,
        http_timeout_secs: 5,
        listener_timeout_secs: 5,
    }
}

/// Credentials that stay valid for the duration of a test.
#[allow(dead_code)]
pub fn valid_credentials() -> Credentials {
    Credentials {
        access_token: "valid_access".to_string(),
        refresh_token: "valid_refresh".to_string(),
        expires_at: Utc::now().timestamp() + 3600,
    }
}

/// Credentials inside the 5-minute refresh margin.
#[allow(dead_code)]
pub fn expired_credentials() -> Credentials {
    Credentials {
        access_token: "stale_access".to_string(),
        refresh_token: "old_refresh".to_string(),
        expires_at: Utc::now().timestamp(),
    }
}
