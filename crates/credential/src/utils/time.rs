//! Time utilities for credentials
//!
//! Expiry instants are epoch milliseconds, matching the wire format.

use std::time::Duration;

use chrono::Utc;

/// Current wall-clock time in epoch milliseconds
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Time left until `deadline_ms`, or zero if it has passed
#[must_use]
pub fn remaining(deadline_ms: i64, now_ms: i64) -> Duration {
    u64::try_from(deadline_ms.saturating_sub(now_ms))
        .map(Duration::from_millis)
        .unwrap_or_default()
}

/// A duration as milliseconds, saturating at `i64::MAX`
#[must_use]
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
