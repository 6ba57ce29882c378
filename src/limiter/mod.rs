//! Per-backend admission control.
//!
//! # Data Flow
//! ```text
//! acquire(timeout)
//!     → bucket.rs (lazy refill, take one token)
//!     → token available and nobody queued: admitted
//!     → otherwise: rate_limiter.rs queues the caller (FIFO)
//!         → single wake task sleeps until the next token is due
//!         → drains the queue while tokens >= 1
//!         → timeout / shutdown remove the waiter instead
//! ```
//!
//! # Design Decisions
//! - Callers wait (bounded) instead of being rejected
//! - Fractional tokens, no integer quantization
//! - One wake task per limiter, never one timer per waiter
//! - Buckets are never shared between backends

use std::time::Duration;

use thiserror::Error;

mod bucket;
pub mod rate_limiter;

pub use rate_limiter::RateLimiter;

/// Errors raised by a [`RateLimiter`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimiterError {
    /// Refill rate or capacity was not strictly positive.
    #[error("invalid rate limiter configuration: {0}")]
    Configuration(String),

    /// The caller was still queued when its timeout elapsed.
    #[error("no rate limit token within {0:?}")]
    AcquireTimeout(Duration),

    /// The limiter was shut down while the caller was waiting.
    #[error("rate limiter shut down")]
    Shutdown,
}

/// Immutable rate-limit profile of one backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateProfile {
    /// Tokens added per second.
    pub refill_rate_per_sec: f64,
    /// Maximum tokens the bucket holds.
    pub capacity: f64,
    /// Whether the bucket starts at capacity or empty.
    pub start_full: bool,
}

impl RateProfile {
    pub fn new(refill_rate_per_sec: f64, capacity: f64) -> Self {
        Self {
            refill_rate_per_sec,
            capacity,
            start_full: true,
        }
    }
}
