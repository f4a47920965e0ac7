//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// True when a timestamp taken at `stamp_ms` is still inside `ttl_ms` at `now_ms`
///
/// Timestamps from the future (clock skew, hand-edited files) count as fresh.
pub fn is_fresh(stamp_ms: i64, ttl_ms: i64, now_ms: i64) -> bool {
    now_ms.saturating_sub(stamp_ms) < ttl_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_now_millis_matches_now() {
        let a = now().timestamp_millis();
        let b = now_millis();
        assert!(b >= a);
        assert!(b - a < 1_000);
    }

    #[test]
    fn test_is_fresh_inside_window() {
        assert!(is_fresh(1_000, 3_600_000, 1_000));
        assert!(is_fresh(1_000, 3_600_000, 3_600_999));
    }

    #[test]
    fn test_is_fresh_boundary_is_stale() {
        // now - stamp == ttl is already expired
        assert!(!is_fresh(0, 3_600_000, 3_600_000));
        assert!(!is_fresh(0, 3_600_000, 7_200_000));
    }

    #[test]
    fn test_future_stamp_is_fresh() {
        assert!(is_fresh(10_000, 100, 5_000));
    }
}
