// SPDX-License-Identifier: MIT

//! OAuth credential triple as persisted in the settings store.

use serde::{Deserialize, Serialize};

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Access/refresh token pair with its absolute expiry.
///
/// Always read and written as a unit: the store must never observe the
/// expiry updated without both tokens (or vice versa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, epoch seconds.
    pub expires_at: i64,
}

impl Credentials {
    /// Whether the access token is expired or expiring within the refresh
    /// margin, judged at `now` (epoch seconds). Boundary inclusive: at
    /// exactly `expires_at - margin` the token counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at - TOKEN_REFRESH_MARGIN_SECS
    }

    /// `is_expired_at` against the current system clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}
