//! Requests-per-second limiter refilled on wall-clock second boundaries

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::schedule::spawn_aligned;

/// Refill period of the limiter
pub const REFILL_PERIOD: Duration = Duration::from_secs(1);

/// Acquire was interrupted by shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limiter closed")]
pub struct Cancelled;

/// Permit pool refilled to its ceiling once per second
///
/// Permits are consumed, not returned: the only source of new permits is
/// [`RateLimiter::refill`].
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: usize,
    semaphore: Semaphore,
    // Serializes refills so the read-then-add stays below the ceiling
    refill_lock: Mutex<()>,
}

impl RateLimiter {
    /// Create a limiter with a full pool
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            semaphore: Semaphore::new(ceiling),
            refill_lock: Mutex::new(()),
        }
    }

    /// Wait for one permit and consume it
    pub async fn acquire(&self) -> Result<(), Cancelled> {
        let permit = self.semaphore.acquire().await.map_err(|_| Cancelled)?;
        permit.forget();
        Ok(())
    }

    /// Top the pool back up to the ceiling
    pub fn refill(&self) {
        let _guard = self
            .refill_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_closed() {
            return;
        }

        // Acquirers can only lower the count between these two lines
        let available = self.semaphore.available_permits();
        if available < self.ceiling {
            let released = self.ceiling - available;
            self.semaphore.add_permits(released);
            trace!(released, "Rate limiter refilled");
        }
    }

    /// Spawn the per-second refill timer
    pub fn spawn_refill(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        spawn_aligned("rate_limiter", REFILL_PERIOD, shutdown, move || limiter.refill())
    }

    /// Fail all pending and future acquires
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`RateLimiter::close`] was called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Permits left in the current second
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits restored by each refill
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};

    #[tokio::test]
    async fn test_sixth_acquire_waits_for_refill() {
        let limiter = RateLimiter::new(5);

        for _ in 0..5 {
            limiter.acquire().await.unwrap();
        }
        assert_eq!(limiter.available(), 0);

        let mut sixth = task::spawn(limiter.acquire());
        assert_pending!(sixth.poll());

        limiter.refill();
        assert!(sixth.is_woken());
        assert_ready_ok!(sixth.poll());
        assert_eq!(limiter.available(), 4);
    }

    #[tokio::test]
    async fn test_refill_never_exceeds_ceiling() {
        let limiter = RateLimiter::new(5);

        for _ in 0..10 {
            limiter.refill();
        }
        assert_eq!(limiter.available(), 5);

        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        limiter.refill();
        limiter.refill();
        assert_eq!(limiter.available(), 5);
    }

    #[tokio::test]
    async fn test_close_cancels_waiters() {
        let limiter = RateLimiter::new(1);
        limiter.acquire().await.unwrap();

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        limiter.close();
        assert!(limiter.is_closed());
        assert!(waiting.is_woken());
        assert_ready_err!(waiting.poll());
        assert_eq!(limiter.acquire().await, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refills_each_second() {
        let limiter = Arc::new(RateLimiter::new(3));
        let shutdown = CancellationToken::new();
        let handle = limiter.spawn_refill(shutdown.clone());

        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }

        // Blocks until the next aligned tick
        tokio::time::timeout(Duration::from_millis(1100), limiter.acquire())
            .await
            .expect("refill tick should arrive within one second")
            .unwrap();
        assert_eq!(limiter.available(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(limiter.available(), 3);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
