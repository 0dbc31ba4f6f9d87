// SPDX-License-Identifier: MIT

//! Services module - OAuth flow, API client and score aggregation.

pub mod oauth;
pub mod oura;
pub mod scores;

pub use oauth::AuthManager;
pub use oura::OuraClient;
pub use scores::ScoreAggregator;
