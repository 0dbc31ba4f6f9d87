// SPDX-License-Identifier: MIT

//! Application error types.
//!
//! Every external fault (network, malformed payloads, the local callback)
//! is converted into a typed variant here; nothing is retried and nothing
//! is swallowed.

use crate::models::ScoreCategory;

/// Application error type covering the OAuth flow, token lifecycle and
/// score fetching.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing OAuth client configuration: {0}")]
    Configuration(&'static str),

    #[error("authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("OAuth state mismatch in authorization callback")]
    CsrfMismatch,

    #[error("authorization callback did not include a code")]
    MissingCode,

    #[error("malformed authorization callback: {0}")]
    InvalidCallback(String),

    #[error("another authorization attempt is already in progress")]
    AuthorizationPending,

    #[error("callback port {0} is already in use")]
    CallbackPortInUse(u16),

    #[error("token exchange failed with status {0}")]
    TokenExchange(u16),

    #[error("token refresh failed with status {0}")]
    TokenRefresh(u16),

    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("not authenticated with Oura")]
    NotAuthenticated,

    #[error("{category} request failed with status {status}")]
    ApiRequest {
        category: ScoreCategory,
        status: u16,
    },

    #[error("{failed} of 3 score fetches failed", failed = .0.len())]
    PartialFetch(Vec<AppError>),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    InvalidResponse(String),

    #[error("settings store error: {0}")]
    Store(String),

    #[error("authorization attempt abandoned by shutdown")]
    Shutdown,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this failure means the stored credentials are no longer
    /// usable and the user should run the authorization flow again.
    pub fn needs_reauthorization(&self) -> bool {
        match self {
            AppError::NotAuthenticated | AppError::NoRefreshToken => true,
            // The token endpoint rejects a dead refresh token with 400/401.
            AppError::TokenRefresh(400 | 401) => true,
            AppError::ApiRequest { status: 401, .. } => true,
            AppError::PartialFetch(failures) => {
                failures.iter().any(|e| e.needs_reauthorization())
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else if err.is_decode() {
            AppError::InvalidResponse(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
