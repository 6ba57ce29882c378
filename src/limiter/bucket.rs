//! Fractional token bucket.

use tokio::time::Instant;

/// Token bucket state owned by a single limiter.
///
/// Tokens are tracked as `f64` so slow refill rates accumulate partial tokens
/// instead of rounding them away.
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub(crate) fn new(refill_rate: f64, capacity: f64, start_full: bool) -> Self {
        Self {
            tokens: if start_full { capacity } else { 0.0 },
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Add the tokens earned since the last refill.
    pub(crate) fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Refill, then take one token if a whole token is available.
    pub(crate) fn try_take(&mut self) -> bool {
        self.refill();
        self.take_refilled()
    }

    /// Take one token without refilling first.
    pub(crate) fn take_refilled(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Return a token that was taken but never used.
    pub(crate) fn give_back(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }

    /// Time until one whole token is available (zero if one already is).
    pub(crate) fn time_to_next_token(&self) -> std::time::Duration {
        if self.tokens >= 1.0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
    }

    pub(crate) fn tokens(&self) -> f64 {
        self.tokens
    }

    pub(crate) fn capacity(&self) -> f64 {
        self.capacity
    }

    pub(crate) fn refill_rate(&self) -> f64 {
        self.refill_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_full_bucket_drains_exactly_capacity() {
        let mut bucket = TokenBucket::new(1.0, 4.0, true);
        for _ in 0..4 {
            assert!(bucket.try_take());
        }
        assert!(!bucket.try_take());
        assert!(bucket.tokens() >= 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_start() {
        let mut bucket = TokenBucket::new(2.0, 4.0, false);
        assert_eq!(bucket.tokens(), 0.0);
        assert!(!bucket.try_take());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_proportional_and_capped() {
        let mut bucket = TokenBucket::new(4.0, 10.0, false);

        tokio::time::advance(Duration::from_millis(500)).await;
        bucket.refill();
        assert!((bucket.tokens() - 2.0).abs() < 1e-6);

        tokio::time::advance(Duration::from_secs(60)).await;
        bucket.refill();
        assert_eq!(bucket.tokens(), 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_back_never_exceeds_capacity() {
        let mut bucket = TokenBucket::new(1.0, 2.0, true);
        bucket.give_back();
        assert_eq!(bucket.tokens(), 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_to_next_token() {
        let mut bucket = TokenBucket::new(5.0, 1.0, true);
        assert_eq!(bucket.time_to_next_token(), Duration::ZERO);
        assert!(bucket.try_take());
        assert_eq!(bucket.time_to_next_token(), Duration::from_millis(200));
    }
}
