// SPDX-License-Identifier: MIT

//! Data models: credentials and daily score types.

pub mod credentials;
pub mod score;

pub use credentials::{Credentials, TOKEN_REFRESH_MARGIN_SECS};
pub use score::{Freshness, ScoreCategory, ScoreSummary};
