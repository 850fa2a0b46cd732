//! Shared time utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time as a Unix timestamp (seconds since epoch).
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Format a Unix timestamp as a human-readable UTC string, used in
/// lockout denial reasons.
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_known_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
