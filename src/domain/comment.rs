// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum comment length in characters
pub const MAX_COMMENT_CHARS: usize = 500;

/// Display name used when the author has none
pub const ANONYMOUS: &str = "Anonymous";

/// Stored comment; immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Store-assigned id
    pub id: String,
    /// Event commented on
    pub event_id: String,
    /// Author id
    pub user_id: String,
    /// Author display name
    pub user_name: String,
    /// Author avatar URL
    #[serde(default)]
    pub user_avatar: Option<String>,
    /// Trimmed text
    pub comment: String,
    /// Creation time
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Age label relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> String {
        relative_age(self.created_at, now)
    }
}

/// Human readable age of a timestamp
///
/// `"just now"` under a minute (and for future timestamps), then minutes,
/// hours and days, always rounded down.
pub fn relative_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 24 * 60 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (24 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test_case(Duration::seconds(0), "just now" ; "same instant")]
    #[test_case(Duration::seconds(59), "just now" ; "under a minute")]
    #[test_case(Duration::minutes(1), "1m ago" ; "one minute")]
    #[test_case(Duration::minutes(59), "59m ago" ; "under an hour")]
    #[test_case(Duration::minutes(60), "1h ago" ; "one hour")]
    #[test_case(Duration::minutes(1439), "23h ago" ; "under a day")]
    #[test_case(Duration::minutes(1440), "1d ago" ; "one day")]
    #[test_case(Duration::days(9), "9d ago" ; "several days")]
    #[test_case(Duration::minutes(-5), "just now" ; "future timestamp")]
    fn test_relative_age(age: Duration, expected: &str) {
        assert_eq!(relative_age(now() - age, now()), expected);
    }
}
