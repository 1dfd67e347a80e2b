//! Timestamp helpers for entity lifecycles.

use chrono::{DateTime, Duration, Utc};

/// Compute the next `updated_at` for a record last written at `previous`.
///
/// Update timestamps must strictly increase on every mutation, even when two writes land
/// within the clock's resolution (or the wall clock stepped backwards).
pub fn next_update_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}
