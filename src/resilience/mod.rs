//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted backend call:
//!     → retries.rs (run attempt, on failure ask backoff.rs for a delay)
//!     → backoff.rs (exponential growth, capped, 0..=jitter ms added)
//!     → last failure surfaces as Exhausted { attempts, last_error }
//! ```
//!
//! # Design Decisions
//! - Retry loop is generic over the operation and its error
//! - Jittered backoff prevents synchronized retries across callers
//! - No retry around admission; only the backend call is retried

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{retry_with_backoff, Exhausted, RetryPolicy};
