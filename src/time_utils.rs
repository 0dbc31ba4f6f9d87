// SPDX-License-Identifier: MIT

//! Shared helpers for local calendar dates.

use chrono::{Local, NaiveDate};

/// Lookback window length in days (inclusive of today).
pub const LOOKBACK_DAYS: i64 = 7;

/// An inclusive `[start, end]` range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window covering the `days` days up to and including `end`.
    pub fn ending_at(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }
}

/// Today according to the local clock.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole days between `date` and `today` (0 for today, 1 for yesterday).
pub fn days_old(today: NaiveDate, date: NaiveDate) -> i64 {
    (today - date).num_days()
}
