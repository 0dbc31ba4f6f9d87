// SPDX-License-Identifier: MIT

//! Aggregation of the three daily time-series into a "latest available
//! day" summary.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ScoreCategory, ScoreSummary};
use crate::services::oauth::AuthManager;
use crate::services::oura::OuraClient;
use crate::time_utils::{self, DateWindow, LOOKBACK_DAYS};

/// Fetches the three category endpoints concurrently and joins them by
/// date into a single summary.
pub struct ScoreAggregator {
    auth: AuthManager,
    client: OuraClient,
}

impl ScoreAggregator {
    pub fn new(config: &Config, auth: AuthManager) -> Result<Self> {
        let client = OuraClient::new(
            config.api_base.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self { auth, client })
    }

    /// Scores for the most recent day with any data inside the 7-day
    /// lookback window, plus how old that day is.
    pub async fn latest_scores(&self) -> Result<ScoreSummary> {
        self.latest_scores_for(time_utils::today_local()).await
    }

    async fn latest_scores_for(&self, today: NaiveDate) -> Result<ScoreSummary> {
        let window = DateWindow::ending_at(today, LOOKBACK_DAYS);

        // Refresh at most once, up front; all three requests share the
        // resulting token.
        let token = self.auth.ensure_valid_access_token().await?;

        tracing::debug!(start = %window.start, end = %window.end, "fetching daily scores");
        let (sleep, readiness, activity) = tokio::join!(
            self.client
                .fetch_daily_scores(ScoreCategory::Sleep, &token, window),
            self.client
                .fetch_daily_scores(ScoreCategory::Readiness, &token, window),
            self.client
                .fetch_daily_scores(ScoreCategory::Activity, &token, window),
        );

        // Settle-all: every fetch has reached a terminal state by now; a
        // single aggregate error reports all category failures.
        let mut failures = Vec::new();
        let sleep = settle(sleep, &mut failures);
        let readiness = settle(readiness, &mut failures);
        let activity = settle(activity, &mut failures);

        if !failures.is_empty() {
            return Err(AppError::PartialFetch(failures));
        }

        Ok(summarize(today, &sleep, &readiness, &activity))
    }
}

fn settle(
    result: Result<HashMap<NaiveDate, u8>>,
    failures: &mut Vec<AppError>,
) -> HashMap<NaiveDate, u8> {
    match result {
        Ok(scores) => scores,
        Err(e) => {
            failures.push(e);
            HashMap::new()
        }
    }
}

/// Join the three per-category maps: pick the most recent date with data
/// in any category and report each category's score for that exact date.
fn summarize(
    today: NaiveDate,
    sleep: &HashMap<NaiveDate, u8>,
    readiness: &HashMap<NaiveDate, u8>,
    activity: &HashMap<NaiveDate, u8>,
) -> ScoreSummary {
    let latest = sleep
        .keys()
        .chain(readiness.keys())
        .chain(activity.keys())
        .max()
        .copied();

    let Some(date) = latest else {
        return ScoreSummary::empty();
    };

    ScoreSummary {
        date: Some(date),
        sleep: sleep.get(&date).copied(),
        readiness: readiness.get(&date).copied(),
        activity: activity.get(&date).copied(),
        age_days: Some(time_utils::days_old(today, date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn map(entries: &[(&str, u8)]) -> HashMap<NaiveDate, u8> {
        entries.iter().map(|(day, score)| (d(day), *score)).collect()
    }

    #[test]
    fn test_empty_categories_give_empty_summary() {
        let empty = HashMap::new();
        let summary = summarize(d("2024-01-10"), &empty, &empty, &empty);
        assert_eq!(summary, ScoreSummary::empty());
    }

    #[test]
    fn test_single_category_selected() {
        let empty = HashMap::new();
        let activity = map(&[("2024-01-05", 80)]);
        let summary = summarize(d("2024-01-10"), &empty, &empty, &activity);

        assert_eq!(summary.date, Some(d("2024-01-05")));
        assert_eq!(summary.activity, Some(80));
        assert_eq!(summary.sleep, None);
        assert_eq!(summary.readiness, None);
        assert_eq!(summary.age_days, Some(5));
    }

    #[test]
    fn test_latest_date_wins_over_most_populated() {
        // Sleep and readiness both have data on day D-2; activity alone
        // has the newer day. The newer day must win.
        let sleep = map(&[("2024-01-03", 70)]);
        let readiness = map(&[("2024-01-03", 75)]);
        let activity = map(&[("2024-01-05", 88)]);
        let summary = summarize(d("2024-01-05"), &sleep, &readiness, &activity);

        assert_eq!(summary.date, Some(d("2024-01-05")));
        assert_eq!(summary.activity, Some(88));
        // Not a rollup: older sleep/readiness data is not pulled forward.
        assert_eq!(summary.sleep, None);
        assert_eq!(summary.readiness, None);
        assert_eq!(summary.age_days, Some(0));
    }

    #[test]
    fn test_all_categories_on_selected_date() {
        let sleep = map(&[("2024-01-04", 81), ("2024-01-05", 82)]);
        let readiness = map(&[("2024-01-05", 91)]);
        let activity = map(&[("2024-01-05", 72)]);
        let summary = summarize(d("2024-01-06"), &sleep, &readiness, &activity);

        assert_eq!(summary.date, Some(d("2024-01-05")));
        assert_eq!(summary.sleep, Some(82));
        assert_eq!(summary.readiness, Some(91));
        assert_eq!(summary.activity, Some(72));
        assert_eq!(summary.age_days, Some(1));
    }
}
