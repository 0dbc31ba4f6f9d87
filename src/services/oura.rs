// SPDX-License-Identifier: MIT

//! Low-level Oura API client for the daily score collections.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::ScoreCategory;
use crate::time_utils::DateWindow;

/// Oura API client.
#[derive(Clone)]
pub struct OuraClient {
    http: reqwest::Client,
    api_base: String,
}

/// Envelope for the daily collections: `{"data": [...]}`.
#[derive(Debug, Deserialize)]
struct DailyResponse {
    data: Vec<DailyRecord>,
}

/// One day's record. `score` is null on days the metric was not produced
/// (e.g. the ring was not worn overnight).
#[derive(Debug, Deserialize)]
struct DailyRecord {
    day: NaiveDate,
    score: Option<u8>,
}

impl OuraClient {
    pub fn new(api_base: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self { http, api_base })
    }

    /// Fetch one category's daily scores for the window, indexed by date.
    /// Records with a null score are dropped.
    pub async fn fetch_daily_scores(
        &self,
        category: ScoreCategory,
        access_token: &str,
        window: DateWindow,
    ) -> Result<HashMap<NaiveDate, u8>> {
        let url = format!("{}/{}", self.api_base, category.endpoint_path());

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("start_date", window.start.to_string()),
                ("end_date", window.end.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(%category, status, "daily score request failed");
            return Err(AppError::ApiRequest { category, status });
        }

        let body: DailyResponse = response
            .json()
            .await
            .map_err(|e| AppError::InvalidResponse(format!("{} response: {}", category, e)))?;

        let mut scores = HashMap::new();
        for record in body.data {
            if let Some(score) = record.score {
                scores.insert(record.day, score);
            }
        }

        tracing::debug!(%category, days = scores.len(), "daily scores fetched");
        Ok(scores)
    }
}
