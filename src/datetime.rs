//! Date/time utilities for Suimail.
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision,
//! so lexical order in SQL matches chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, formatted for storage.
pub fn now_storage() -> String {
    to_storage(&Utc::now())
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the SQLite `datetime('now')` format (YYYY-MM-DD HH:MM:SS).
pub fn parse(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a stored timestamp, falling back to the current time when it is malformed.
pub fn parse_or_now(datetime_str: &str) -> DateTime<Utc> {
    parse(datetime_str).unwrap_or_else(Utc::now)
}
