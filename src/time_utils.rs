// SPDX-License-Identifier: MIT

//! Shared helpers for date/time formatting and age derivation.

use chrono::{DateTime, NaiveDate, Utc};

/// Format an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_timestamp_ms(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Age in whole years as days-since-birth / 365.
///
/// Imprecise by up to a day near leap years; the vendor analysis endpoint
/// only needs whole years, so the approximation is acceptable.
pub fn age_years(birth_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - birth_date).num_days() / 365
}
