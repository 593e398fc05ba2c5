//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whether `since` lies more than `ttl` in the past relative to `now`.
///
/// Timestamps in the future never count as expired.
pub fn is_older_than(since: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match (now - since).to_std() {
        Ok(age) => age > ttl,
        Err(_) => false,
    }
}
