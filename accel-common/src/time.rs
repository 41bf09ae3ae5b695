//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a whole number of days to a chrono duration
pub fn days(days: u32) -> Duration {
    Duration::days(i64::from(days))
}

/// True when at least `ttl` has passed between `since` and `now`
///
/// A `since` in the future (clock skew) is never due.
pub fn is_due(since: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(since) >= ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_days_conversion() {
        assert_eq!(days(0), Duration::zero());
        assert_eq!(days(7).num_seconds(), 7 * 24 * 3600);
    }

    #[test]
    fn test_is_due_boundary_inclusive() {
        let start = at(1_700_000_000);
        let ttl = days(7);
        assert!(!is_due(start, start + ttl - Duration::seconds(1), ttl));
        assert!(is_due(start, start + ttl, ttl));
        assert!(is_due(start, start + ttl + Duration::seconds(1), ttl));
    }

    #[test]
    fn test_is_due_zero_ttl_always_due() {
        let start = at(1_700_000_000);
        assert!(is_due(start, start, Duration::zero()));
    }

    #[test]
    fn test_is_due_future_timestamp_not_due() {
        let now = at(1_700_000_000);
        assert!(!is_due(now + days(1), now, days(1)));
    }
}
