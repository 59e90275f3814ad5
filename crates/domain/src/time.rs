//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for snapshot fetch times and announcements.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Elapsed time between `since` and `at`, clamped to zero when `since` is in
/// the future (clock adjustments).
#[must_use]
pub fn elapsed(since: Timestamp, at: Timestamp) -> Duration {
    (at - since).to_std().unwrap_or(Duration::ZERO)
}
