// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting in API responses.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Same as [`format_utc_rfc3339`] for optional timestamps.
pub fn format_opt_utc_rfc3339(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(format_utc_rfc3339)
}
