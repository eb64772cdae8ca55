//! Timestamp parsing and normalization.
//!
//! Accepts RFC3339 with any offset, or a bare `YYYY-MM-DDTHH:MM:SS[.fff]`
//! treated as UTC. Output is always RFC3339 UTC with a `Z` suffix, so
//! normalizing twice is a no-op.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const BARE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Parse a timestamp string into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    BARE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Render a UTC timestamp in canonical form.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse and re-render; `None` for malformed input.
pub fn normalize_timestamp(value: &str) -> Option<String> {
    parse_timestamp(value).map(|ts| format_timestamp(&ts))
}
