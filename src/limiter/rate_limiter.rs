//! Token-bucket limiter with bounded-wait FIFO admission.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::limiter::bucket::TokenBucket;
use crate::limiter::{LimiterError, RateProfile};

/// Lower bound on the wake delay so float rounding cannot spin the wake task.
const MIN_WAKE_DELAY: Duration = Duration::from_millis(1);

type Grant = oneshot::Sender<Result<(), LimiterError>>;

/// A caller parked until a token frees up.
struct Waiter {
    id: u64,
    grant: Grant,
}

struct State {
    bucket: TokenBucket,
    waiters: VecDeque<Waiter>,
    wake: Option<JoinHandle<()>>,
    next_waiter_id: u64,
    shut_down: bool,
}

impl State {
    /// Hand out tokens to queued waiters, oldest first.
    fn drain(&mut self) {
        while !self.waiters.is_empty() {
            if !self.bucket.take_refilled() {
                break;
            }
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.grant.send(Ok(())).is_err() {
                // Caller went away; the token goes back.
                self.bucket.give_back();
            } else {
                tracing::trace!(waiter = waiter.id, "Token granted to queued waiter");
            }
        }
    }
}

struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-backend admission control.
///
/// Callers that find the bucket empty are queued rather than rejected. One wake
/// task per limiter sleeps until the next token is due, then drains the queue in
/// arrival order. Every state change happens under the limiter's mutex.
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl RateLimiter {
    /// Create a limiter refilling `refill_rate_per_sec` tokens per second up to
    /// `capacity`. Both must be finite and strictly positive.
    pub fn new(
        refill_rate_per_sec: f64,
        capacity: f64,
        start_full: bool,
    ) -> Result<Self, LimiterError> {
        if !refill_rate_per_sec.is_finite() || refill_rate_per_sec <= 0.0 {
            return Err(LimiterError::Configuration(format!(
                "refill rate must be positive, got {refill_rate_per_sec}"
            )));
        }
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(LimiterError::Configuration(format!(
                "capacity must be positive, got {capacity}"
            )));
        }

        let state = State {
            bucket: TokenBucket::new(refill_rate_per_sec, capacity, start_full),
            waiters: VecDeque::new(),
            wake: None,
            next_waiter_id: 0,
            shut_down: false,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
            }),
        })
    }

    pub fn from_profile(profile: &RateProfile) -> Result<Self, LimiterError> {
        Self::new(profile.refill_rate_per_sec, profile.capacity, profile.start_full)
    }

    /// Take a token if one is available right now.
    ///
    /// Always false once the limiter has been shut down.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.shared.lock();
        if state.shut_down {
            return false;
        }
        state.bucket.try_take()
    }

    /// Wait for a token.
    ///
    /// Succeeds immediately when nobody is queued and a token is available.
    /// Otherwise the caller joins the back of the queue. With a `timeout`, a
    /// caller still queued when it elapses is removed and gets
    /// [`LimiterError::AcquireTimeout`].
    pub async fn acquire(&self, timeout: Option<Duration>) -> Result<(), LimiterError> {
        let (id, mut granted) = {
            let mut state = self.shared.lock();
            if state.shut_down {
                return Err(LimiterError::Shutdown);
            }
            if state.waiters.is_empty() && state.bucket.try_take() {
                return Ok(());
            }

            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            let (grant, granted) = oneshot::channel();
            state.waiters.push_back(Waiter { id, grant });
            tracing::debug!(
                waiter = id,
                queued = state.waiters.len(),
                tokens = state.bucket.tokens(),
                "No token available, queueing"
            );
            self.schedule_wake(&mut state);
            (id, granted)
        };

        let Some(timeout) = timeout else {
            return granted.await.unwrap_or(Err(LimiterError::Shutdown));
        };

        match tokio::time::timeout(timeout, &mut granted).await {
            Ok(result) => result.unwrap_or(Err(LimiterError::Shutdown)),
            Err(_) => {
                let mut state = self.shared.lock();
                if let Some(pos) = state.waiters.iter().position(|w| w.id == id) {
                    state.waiters.remove(pos);
                    tracing::debug!(waiter = id, ?timeout, "Admission wait timed out");
                    return Err(LimiterError::AcquireTimeout(timeout));
                }
                drop(state);
                // Resolved under the lock before the timeout got there.
                granted.try_recv().unwrap_or(Err(LimiterError::Shutdown))
            }
        }
    }

    /// Fail every queued waiter and stop the wake task. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;

        if let Some(wake) = state.wake.take() {
            wake.abort();
        }

        let pending = state.waiters.len();
        for waiter in state.waiters.drain(..) {
            let _ = waiter.grant.send(Err(LimiterError::Shutdown));
        }
        tracing::debug!(failed_waiters = pending, "Rate limiter shut down");
    }

    /// Tokens currently in the bucket, after refilling.
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.shared.lock();
        state.bucket.refill();
        state.bucket.tokens()
    }

    /// Number of callers waiting for a token.
    pub fn queued(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    pub fn capacity(&self) -> f64 {
        self.shared.lock().bucket.capacity()
    }

    pub fn refill_rate(&self) -> f64 {
        self.shared.lock().bucket.refill_rate()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shut_down
    }

    fn schedule_wake(&self, state: &mut State) {
        if state.wake.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        state.wake = Some(tokio::spawn(wake_loop(shared)));
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep until the next token is due, drain, repeat while anyone is queued.
async fn wake_loop(shared: Arc<Shared>) {
    loop {
        let delay = {
            let mut state = shared.lock();
            state.bucket.refill();
            state.drain();
            if state.waiters.is_empty() || state.shut_down {
                state.wake = None;
                return;
            }
            state.bucket.time_to_next_token().max(MIN_WAKE_DELAY)
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(matches!(
            RateLimiter::new(0.0, 5.0, true),
            Err(LimiterError::Configuration(_))
        ));
        assert!(matches!(
            RateLimiter::new(1.0, -1.0, true),
            Err(LimiterError::Configuration(_))
        ));
        assert!(matches!(
            RateLimiter::new(f64::NAN, 1.0, true),
            Err(LimiterError::Configuration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_succeeds_capacity_times() {
        let limiter = RateLimiter::new(1.0, 3.0, true).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert!(limiter.available_tokens() >= 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_stay_within_bounds() {
        let limiter = RateLimiter::new(10.0, 2.0, true).unwrap();
        for i in 0..50 {
            limiter.try_acquire();
            if i % 3 == 0 {
                tokio::time::advance(Duration::from_millis(70)).await;
            }
            let tokens = limiter.available_tokens();
            assert!((0.0..=2.0).contains(&tokens), "tokens out of bounds: {tokens}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_timeout_fails() {
        let limiter = RateLimiter::new(1.0, 1.0, false).unwrap();
        let err = limiter
            .acquire(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert_eq!(err, LimiterError::AcquireTimeout(Duration::from_millis(100)));
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generous_timeout_completes() {
        let limiter = RateLimiter::new(2.0, 1.0, false).unwrap();
        let start = Instant::now();
        limiter.acquire(Some(Duration::from_secs(5))).await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(495), "waited {waited:?}");
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fails_waiters_and_is_idempotent() {
        let limiter = Arc::new(RateLimiter::new(0.1, 1.0, false).unwrap());

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire(None).await }));
        }
        while limiter.queued() < 3 {
            tokio::task::yield_now().await;
        }

        assert!(!limiter.is_shut_down());
        limiter.shutdown();
        limiter.shutdown();
        assert!(limiter.is_shut_down());

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(LimiterError::Shutdown));
        }
        assert_eq!(limiter.acquire(None).await, Err(LimiterError::Shutdown));
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiter_returns_its_token() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1.0, false).unwrap());

        let abandoned = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire(None).await })
        };
        while limiter.queued() < 1 {
            tokio::task::yield_now().await;
        }
        abandoned.abort();
        let _ = abandoned.await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(limiter.queued(), 0);
        assert!(limiter.try_acquire());
    }
}
