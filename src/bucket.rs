//! Token-bucket rate limiting for analysis calls
//!
//! Refill is lazy: the balance is recomputed from elapsed time at the
//! start of every check, so there is no background timer and the value
//! is always consistent at the moment of use. Tests drive the `*_at`
//! variants with explicit timestamps.

use crate::rules::Priority;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_CAPACITY: f64 = 15.0;
pub const DEFAULT_REFILL_PER_SEC: f64 = 3.0;

/// Read-only bucket observation for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketStatus {
    /// Whole tokens currently available, rounded down
    pub tokens: u32,
    pub capacity: u32,
}

pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_refill: Utc::now(),
        }
    }

    /// Try to pay for one analysis at the given priority. Returns true
    /// and subtracts the cost when the balance covers it; otherwise
    /// leaves the balance unchanged.
    pub fn try_consume(&mut self, priority: Priority) -> bool {
        self.try_consume_at(Utc::now(), priority)
    }

    pub fn try_consume_at(&mut self, now: DateTime<Utc>, priority: Priority) -> bool {
        self.refill_at(now);

        let cost = priority.token_cost();
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Current balance without side effects; the projected refill is
    /// computed but not stored.
    pub fn status(&self) -> BucketStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> BucketStatus {
        let projected = (self.tokens + self.elapsed_secs(now) * self.refill_per_sec)
            .min(self.capacity);
        BucketStatus {
            tokens: projected.floor() as u32,
            capacity: self.capacity.floor() as u32,
        }
    }

    fn refill_at(&mut self, now: DateTime<Utc>) {
        self.tokens = (self.tokens + self.elapsed_secs(now) * self.refill_per_sec)
            .min(self.capacity);
        self.last_refill = now;
    }

    /// Seconds since the last refill, clamped at zero so a clock step
    /// backwards never drains the bucket.
    fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_refill).num_milliseconds().max(0) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bucket() -> (TokenBucket, DateTime<Utc>) {
        let start = Utc::now();
        let mut bucket = TokenBucket::new(DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SEC);
        bucket.last_refill = start;
        (bucket, start)
    }

    #[test]
    fn test_consume_subtracts_priority_cost() {
        let (mut bucket, start) = bucket();
        assert!(bucket.try_consume_at(start, Priority::Low));
        assert_eq!(bucket.status_at(start).tokens, 11);
        assert!(bucket.try_consume_at(start, Priority::Immediate));
        assert_eq!(bucket.status_at(start).tokens, 10);
    }

    #[test]
    fn test_empty_bucket_rejects_and_keeps_balance() {
        let (mut bucket, start) = bucket();
        // 7 high-priority calls cost 14 of 15 tokens.
        for _ in 0..7 {
            assert!(bucket.try_consume_at(start, Priority::High));
        }
        assert!(!bucket.try_consume_at(start, Priority::High));
        assert_eq!(bucket.status_at(start).tokens, 1);
    }

    #[test]
    fn test_lazy_refill_matches_elapsed_time() {
        let (mut bucket, start) = bucket();
        // Drain completely: 3 low (12) + 1 medium (3).
        for _ in 0..3 {
            assert!(bucket.try_consume_at(start, Priority::Low));
        }
        assert!(bucket.try_consume_at(start, Priority::Medium));
        assert_eq!(bucket.status_at(start).tokens, 0);

        // 3 tokens/s: after 2s the balance reads exactly 6.
        let later = start + Duration::seconds(2);
        assert_eq!(bucket.status_at(later).tokens, 6);

        // After 10s the refill caps at capacity.
        let much_later = start + Duration::seconds(10);
        assert_eq!(bucket.status_at(much_later).tokens, 15);
    }

    #[test]
    fn test_status_is_side_effect_free() {
        let (mut bucket, start) = bucket();
        for _ in 0..3 {
            bucket.try_consume_at(start, Priority::Low);
        }
        let later = start + Duration::seconds(1);
        assert_eq!(bucket.status_at(later).tokens, 6);
        // Observing did not refill; consuming at `start` again still
        // sees the un-refilled balance.
        assert!(bucket.try_consume_at(start, Priority::Medium));
        assert_eq!(bucket.status_at(start).tokens, 0);
    }

    #[test]
    fn test_balance_stays_within_bounds() {
        let (mut bucket, start) = bucket();
        let mut now = start;
        for i in 0..50 {
            let priority = match i % 4 {
                0 => Priority::Immediate,
                1 => Priority::High,
                2 => Priority::Medium,
                _ => Priority::Low,
            };
            bucket.try_consume_at(now, priority);
            let status = bucket.status_at(now);
            assert!(status.tokens <= DEFAULT_CAPACITY as u32);
            now += Duration::milliseconds(250);
        }
    }

    #[test]
    fn test_clock_step_backwards_is_ignored() {
        let (mut bucket, start) = bucket();
        bucket.try_consume_at(start, Priority::Low);
        let earlier = start - Duration::seconds(30);
        assert_eq!(bucket.status_at(earlier).tokens, 11);
    }
}
