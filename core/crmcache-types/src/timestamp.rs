//! Remote timestamp handling.
//!
//! The CRM reports modification times as naive UTC strings
//! (`2024-01-02 13:45:00`). Some endpoints and most test fixtures use
//! RFC 3339 instead, so both are accepted. The incremental search endpoint
//! wants its cutoff as `2024-01-02T13:45:00Z`.
//!
//! The cache stores instants as UTC milliseconds, so parsed timestamps are
//! truncated to millisecond precision. A cached value read back must compare
//! equal to the same remote value parsed again.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// Sub-second digits kept from remote timestamps.
pub const TIMESTAMP_PRECISION_DIGITS: u16 = 3;

/// Format of modification timestamps in remote payloads.
pub const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the `updated_after_utc` cutoff sent to the search endpoint.
pub const CUTOFF_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parses a timestamp from a remote payload, assuming UTC when no offset is
/// given. Digits below a millisecond are dropped.
pub fn parse_remote_timestamp(raw: &str) -> crate::Result<DateTime<Utc>> {
    parse_exact(raw.trim())
        .map(|at| at.trunc_subsecs(TIMESTAMP_PRECISION_DIGITS))
        .ok_or_else(|| crate::Error::InvalidTimestamp(raw.trim().to_string()))
}

fn parse_exact(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    [REMOTE_TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Formats a cutoff for the search endpoint. Sub-second precision is dropped.
#[must_use]
pub fn format_cutoff(at: DateTime<Utc>) -> String {
    at.format(CUTOFF_FORMAT).to_string()
}
