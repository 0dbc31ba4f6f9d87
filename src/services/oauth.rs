// SPDX-License-Identifier: MIT

//! Oura OAuth2 authorization-code flow and token lifecycle.
//!
//! Handles:
//! - One-shot loopback listener for the authorization redirect
//! - CSRF state generation and validation
//! - Code exchange and token refresh against the token endpoint
//! - Single-flight refresh shared by concurrent callers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Credentials;
use crate::store::SettingsStore;

/// Token endpoint response for both code exchange and refresh.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Owns the OAuth authorization-code flow and the stored credential
/// lifecycle. Cheap to clone; clones share the pending-attempt slot and
/// the refresh lock.
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    config: Config,
    store: Arc<dyn SettingsStore>,
    http: reqwest::Client,
    /// Serializes token refresh; concurrent callers wait here and reuse
    /// the winner's result.
    refresh_lock: Mutex<()>,
    /// Single-slot guard for the pending authorization attempt.
    attempt_pending: Arc<AtomicBool>,
    shutdown: Notify,
    shutdown_requested: AtomicBool,
}

impl AuthManager {
    pub fn new(config: Config, store: Arc<dyn SettingsStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            inner: Arc::new(AuthInner {
                config,
                store,
                http,
                refresh_lock: Mutex::new(()),
                attempt_pending: Arc::new(AtomicBool::new(false)),
                shutdown: Notify::new(),
                shutdown_requested: AtomicBool::new(false),
            }),
        })
    }

    /// Whether credentials are stored at all (they may still be expired).
    pub fn is_authorized(&self) -> Result<bool> {
        Ok(self.inner.store.credentials()?.is_some())
    }

    /// Whether the stored access token is expired or inside the 5-minute
    /// refresh margin. `true` when no credentials are stored.
    pub fn is_token_expired(&self) -> Result<bool> {
        Ok(self
            .inner
            .store
            .credentials()?
            .map(|c| c.is_expired())
            .unwrap_or(true))
    }

    /// Run the full authorization-code flow and persist the resulting
    /// credentials. Convenience wrapper around [`Self::begin_authorization`]
    /// + [`PendingAuthorization::finish`].
    pub async fn authorize(&self) -> Result<Credentials> {
        self.begin_authorization().await?.finish().await
    }

    /// Start an authorization attempt: claim the single pending slot,
    /// generate a fresh CSRF state, bind the loopback listener and open
    /// the authorization URL in the browser.
    ///
    /// Fails with `AuthorizationPending` while another attempt is in
    /// flight, and with `CallbackPortInUse` if the fixed callback port is
    /// taken.
    pub async fn begin_authorization(&self) -> Result<PendingAuthorization> {
        let config = &self.inner.config;
        if config.client_id.is_empty() {
            return Err(AppError::Configuration("client id"));
        }
        if config.client_secret.is_empty() {
            return Err(AppError::Configuration("client secret"));
        }

        let slot = AttemptSlot::claim(&self.inner.attempt_pending)?;
        self.inner.shutdown_requested.store(false, Ordering::SeqCst);

        let state = generate_state()?;

        let port = config.callback_port;
        let listener = match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                return Err(AppError::CallbackPortInUse(port));
            }
            Err(e) => return Err(AppError::Network(e.to_string())),
        };
        tracing::info!(port, "callback listener started");

        let authorization_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}&scope=daily",
            config.authorize_url,
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&config.redirect_uri()),
            urlencoding::encode(&state),
        );

        if config.open_browser {
            if let Err(e) = open::that(&authorization_url) {
                // Not fatal: the user can still open the URL by hand.
                tracing::warn!(error = %e, url = %authorization_url, "failed to open browser");
            }
        } else {
            tracing::info!(url = %authorization_url, "browser launch disabled, open manually");
        }

        Ok(PendingAuthorization {
            manager: self.clone(),
            state,
            listener,
            authorization_url,
            _slot: slot,
        })
    }

    /// Refresh the access token using the stored refresh token. At most
    /// one refresh exchange is in flight at a time; a caller that raced a
    /// concurrent refresh reuses its persisted result instead of spending
    /// the already-rotated refresh token.
    pub async fn refresh_credentials(&self) -> Result<Credentials> {
        let before = self
            .inner
            .store
            .credentials()?
            .ok_or(AppError::NoRefreshToken)?;

        let _guard = self.inner.refresh_lock.lock().await;

        // Re-read after acquiring the lock: a concurrent refresh rotates
        // the refresh token, so a changed token means the work is done.
        let current = self
            .inner
            .store
            .credentials()?
            .ok_or(AppError::NoRefreshToken)?;
        if current.refresh_token != before.refresh_token {
            return Ok(current);
        }

        self.refresh_exchange(&current.refresh_token).await
    }

    /// Get a valid access token, refreshing at most once across concurrent
    /// callers. Followers that arrive during a refresh wait on the lock
    /// and reuse the refreshed credentials.
    pub async fn ensure_valid_access_token(&self) -> Result<String> {
        let credentials = self
            .inner
            .store
            .credentials()?
            .ok_or(AppError::NotAuthenticated)?;
        if !credentials.is_expired() {
            return Ok(credentials.access_token);
        }

        let _guard = self.inner.refresh_lock.lock().await;

        // Re-check after acquiring the lock: another caller may have
        // refreshed while we waited.
        let credentials = self
            .inner
            .store
            .credentials()?
            .ok_or(AppError::NotAuthenticated)?;
        if !credentials.is_expired() {
            return Ok(credentials.access_token);
        }

        tracing::info!("access token expired, refreshing");
        let refreshed = self.refresh_exchange(&credentials.refresh_token).await?;
        Ok(refreshed.access_token)
    }

    /// Run the refresh exchange and persist the result. Callers must hold
    /// `refresh_lock`.
    async fn refresh_exchange(&self, refresh_token: &str) -> Result<Credentials> {
        let config = &self.inner.config;
        let response = self
            .inner
            .http
            .post(&config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(status, "token refresh failed");
            return Err(AppError::TokenRefresh(status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::InvalidResponse(format!("refresh response: {}", e)))?;

        tracing::info!("token refreshed");
        self.persist(token)
    }

    /// Abandon any pending authorization attempt. Idempotent and safe to
    /// call from any state; a pending [`PendingAuthorization::finish`]
    /// resolves with `Shutdown`.
    pub fn shutdown(&self) {
        self.inner.shutdown_requested.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_one();
    }

    /// Exchange an authorization code for tokens and persist them.
    async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        let config = &self.inner.config;
        let redirect_uri = config.redirect_uri();
        let response = self
            .inner
            .http
            .post(&config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::TokenExchange(response.status().as_u16()));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::InvalidResponse(format!("token response: {}", e)))?;

        self.persist(token)
    }

    /// Persist all three credential fields as a unit.
    fn persist(&self, token: TokenResponse) -> Result<Credentials> {
        let credentials = Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now().timestamp() + token.expires_in,
        };
        self.inner.store.set_credentials(&credentials)?;
        Ok(credentials)
    }
}

/// One in-flight authorization attempt: the CSRF state and the live
/// loopback listener. Dropping it releases the pending slot and closes
/// the listener.
pub struct PendingAuthorization {
    manager: AuthManager,
    state: String,
    listener: TcpListener,
    authorization_url: String,
    _slot: AttemptSlot,
}

impl std::fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("authorization_url", &self.authorization_url)
            .finish_non_exhaustive()
    }
}

impl PendingAuthorization {
    /// The URL the user must visit to authorize, carrying this attempt's
    /// CSRF state.
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Wait for the redirect, validate it and exchange the code. The
    /// listener accepts exactly one connection; a response page is written
    /// to the browser and the sockets are closed on every path.
    pub async fn finish(self) -> Result<Credentials> {
        let (mut stream, _peer) = self.accept_callback().await?;
        // Exactly one connection; stop listening before the exchange.
        drop(self.listener);

        let result = self
            .manager
            .handle_callback_io(&mut stream, &self.state)
            .await;
        let _ = stream.shutdown().await;
        result
    }

    /// Wait for the single redirect connection, bounded by the listener
    /// deadline and interruptible by `AuthManager::shutdown`.
    async fn accept_callback(&self) -> Result<(TcpStream, std::net::SocketAddr)> {
        let inner = &self.manager.inner;
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(inner.config.listener_timeout_secs);

        loop {
            tokio::select! {
                _ = inner.shutdown.notified() => {
                    if inner.shutdown_requested.load(Ordering::SeqCst) {
                        tracing::info!("authorization attempt abandoned by shutdown");
                        return Err(AppError::Shutdown);
                    }
                    // Stale wakeup from a shutdown before this attempt.
                }
                accepted = tokio::time::timeout_at(deadline, self.listener.accept()) => {
                    return match accepted {
                        Err(_) => Err(AppError::Timeout),
                        Ok(Ok(pair)) => Ok(pair),
                        Ok(Err(e)) => Err(AppError::Network(e.to_string())),
                    };
                }
            }
        }
    }
}

impl AuthManager {
    /// Parse the redirect request, validate it and run the code exchange.
    /// A response page is written to the browser on every path.
    async fn handle_callback_io(
        &self,
        stream: &mut TcpStream,
        expected_state: &str,
    ) -> Result<Credentials> {
        let mut line = String::new();
        {
            let mut reader = BufReader::new(&mut *stream);
            if let Err(e) = reader.read_line(&mut line).await {
                send_response(stream, 500, "Internal Server Error").await;
                return Err(AppError::Network(e.to_string()));
            }
        }

        let query = match callback::request_query(&line) {
            Some(q) => q.to_string(),
            None => {
                send_response(stream, 400, "Bad Request").await;
                return Err(AppError::InvalidCallback(line.trim().to_string()));
            }
        };
        let params = callback::parse_query(&query);

        if let Some(error) = params.get("error") {
            send_response(stream, 400, &format!("Authorization failed: {}", error)).await;
            return Err(AppError::AuthorizationDenied(error.clone()));
        }

        // Security-critical: a state mismatch must never reach the token
        // exchange.
        match params.get("state") {
            Some(state) if state == expected_state => {}
            _ => {
                tracing::error!("callback state does not match the pending attempt");
                send_response(stream, 400, "Invalid state parameter").await;
                return Err(AppError::CsrfMismatch);
            }
        }

        let code = match params.get("code") {
            Some(code) if !code.is_empty() => code.clone(),
            _ => {
                send_response(stream, 400, "No authorization code received").await;
                return Err(AppError::MissingCode);
            }
        };

        match self.exchange_code(&code).await {
            Ok(credentials) => {
                tracing::info!("token exchange successful");
                send_response(
                    stream,
                    200,
                    "Authorization successful! You can close this window.",
                )
                .await;
                Ok(credentials)
            }
            Err(e) => {
                tracing::error!(error = %e, "token exchange failed");
                send_response(stream, 500, "Token exchange failed").await;
                Err(e)
            }
        }
    }
}

/// Single-slot guard for the pending attempt; released on drop so every
/// exit path of an authorization attempt clears it.
struct AttemptSlot(Arc<AtomicBool>);

impl AttemptSlot {
    fn claim(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag.clone()))
            .map_err(|_| AppError::AuthorizationPending)
    }
}

impl Drop for AttemptSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fresh CSRF state: 32 random bytes, URL-safe base64 without padding.
fn generate_state() -> Result<String> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Write a minimal static HTML page back to the browser. Failures here
/// are logged only; the flow outcome is already decided.
async fn send_response(stream: &mut TcpStream, status: u16, message: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Internal Server Error",
    };
    let body = format!(
        "<!DOCTYPE html><html><body><h1>{}</h1></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::warn!(error = %e, "failed to write callback response");
    }
}

/// Parsing of the redirect request line and its query string.
mod callback {
    use std::collections::HashMap;

    /// Extract the query string from a `GET /callback?... HTTP/1.1`
    /// request line.
    pub(crate) fn request_query(line: &str) -> Option<&str> {
        let rest = line.strip_prefix("GET /callback?")?;
        let end = rest.find(" HTTP")?;
        Some(&rest[..end])
    }

    /// Decode `key=value` pairs, percent-decoding both sides. Pairs that
    /// fail to decode are dropped rather than passed through raw.
    pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            let Some(key) = parts.next().filter(|k| !k.is_empty()) else {
                continue;
            };
            let value = parts.next().unwrap_or("");
            let (Ok(key), Ok(value)) = (urlencoding::decode(key), urlencoding::decode(value))
            else {
                continue;
            };
            params.insert(key.into_owned(), value.into_owned());
        }
        params
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_state_is_unique_and_url_safe() {
        let a = generate_state().unwrap();
        let b = generate_state().unwrap();
        assert_ne!(a, b);
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));
        assert!(!a.contains('='));
        // 32 bytes -> 43 base64 chars without padding.
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_attempt_slot_single_claim() {
        let flag = Arc::new(AtomicBool::new(false));
        let slot = AttemptSlot::claim(&flag).unwrap();
        assert!(matches!(
            AttemptSlot::claim(&flag),
            Err(AppError::AuthorizationPending)
        ));
        drop(slot);
        assert!(AttemptSlot::claim(&flag).is_ok());
    }
}
