// SPDX-License-Identifier: MIT

//! Daily score categories and the aggregated summary.

use chrono::NaiveDate;
use serde::Serialize;

/// One of the three independent daily metrics Oura reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Sleep,
    Readiness,
    Activity,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 3] = [
        ScoreCategory::Sleep,
        ScoreCategory::Readiness,
        ScoreCategory::Activity,
    ];

    /// Path segment under the usercollection API base.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ScoreCategory::Sleep => "daily_sleep",
            ScoreCategory::Readiness => "daily_readiness",
            ScoreCategory::Activity => "daily_activity",
        }
    }
}

impl std::fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScoreCategory::Sleep => "sleep",
            ScoreCategory::Readiness => "readiness",
            ScoreCategory::Activity => "activity",
        };
        f.write_str(name)
    }
}

/// How fresh the selected day's data is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Freshness {
    /// Data from today.
    Current,
    /// Yesterday's data (today's not yet available).
    DayOld,
    /// Data older than a day; carries the age in days.
    Stale(i64),
    /// No data at all in the lookback window.
    NoData,
}

/// Consolidated scores for the most recent day with any data.
///
/// A single-day summary, not a rollup: a category with data elsewhere in
/// the window but not on the selected date reports `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    /// Most recent date with data in any category; `None` if the window
    /// is empty.
    pub date: Option<NaiveDate>,
    pub sleep: Option<u8>,
    pub readiness: Option<u8>,
    pub activity: Option<u8>,
    /// Whole days between today and `date`.
    pub age_days: Option<i64>,
}

impl ScoreSummary {
    /// The explicitly empty summary: no data in the lookback window.
    pub fn empty() -> Self {
        Self {
            date: None,
            sleep: None,
            readiness: None,
            activity: None,
            age_days: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
    }

    pub fn score(&self, category: ScoreCategory) -> Option<u8> {
        match category {
            ScoreCategory::Sleep => self.sleep,
            ScoreCategory::Readiness => self.readiness,
            ScoreCategory::Activity => self.activity,
        }
    }

    pub fn freshness(&self) -> Freshness {
        match self.age_days {
            None => Freshness::NoData,
            Some(0) => Freshness::Current,
            Some(1) => Freshness::DayOld,
            Some(n) => Freshness::Stale(n),
        }
    }

    /// Human-readable freshness for display next to the scores.
    pub fn freshness_label(&self) -> String {
        match self.freshness() {
            Freshness::Current => "Today".to_string(),
            Freshness::DayOld => "Yesterday".to_string(),
            Freshness::Stale(n) => format!("{} days ago", n),
            Freshness::NoData => "No data".to_string(),
        }
    }
}
