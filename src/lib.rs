// SPDX-License-Identifier: MIT

//! Oura-Tracker: authenticated daily-score aggregation for the Oura cloud.
//!
//! This crate owns the OAuth2 authorization-code flow against the Oura
//! API (including the transient loopback callback listener and token
//! refresh) and the concurrent fetch-and-join of the three daily score
//! time-series into a single "latest available day" summary.
//!
//! The surrounding UI, notifications and refresh timer are external
//! callers; they drive [`services::AuthManager`] and
//! [`services::ScoreAggregator`] and never touch token values directly.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{Credentials, ScoreCategory, ScoreSummary};
pub use services::{AuthManager, ScoreAggregator};
