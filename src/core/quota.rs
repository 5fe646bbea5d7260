//! Character quota tracking per hourly window

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Characters remaining in the current billing window
#[derive(Debug)]
pub struct QuotaTracker {
    ceiling: usize,
    remaining: AtomicUsize,
}

impl QuotaTracker {
    /// Create a tracker with a full window
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            remaining: AtomicUsize::new(ceiling),
        }
    }

    /// Reserve `n` characters if available; no side effect otherwise
    pub fn try_consume(&self, n: usize) -> bool {
        let reserved = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                remaining.checked_sub(n)
            });

        match reserved {
            Ok(previous) => {
                debug!(consumed = n, remaining = previous - n, "Reserved symbols");
                true
            }
            Err(remaining) => {
                debug!(requested = n, remaining, "Symbols quota exhausted");
                false
            }
        }
    }

    /// Start a new window, forgetting everything consumed so far
    pub fn reset_window(&self) {
        self.remaining.store(self.ceiling, Ordering::Release);
        info!(limit = self.ceiling, "Symbols limit was reset");
    }

    /// Remaining characters
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Configured ceiling per window
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Check if quota is low (less than 10% remaining)
    pub fn is_low(&self) -> bool {
        self.remaining() < self.ceiling / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_quota_tracker() {
        let tracker = QuotaTracker::new(1000);

        assert!(tracker.try_consume(500));
        assert_eq!(tracker.remaining(), 500);

        // Should not be able to use more than available, and nothing is taken
        assert!(!tracker.try_consume(600));
        assert_eq!(tracker.remaining(), 500);

        assert!(tracker.try_consume(500));
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_ceiling_consumed_once_per_window() {
        let tracker = QuotaTracker::new(100);

        assert!(tracker.try_consume(100));
        assert!(!tracker.try_consume(1));
        assert!(!tracker.try_consume(1));

        tracker.reset_window();
        assert!(tracker.try_consume(1));
        assert_eq!(tracker.remaining(), 99);
    }

    #[test]
    fn test_zero_always_succeeds() {
        let tracker = QuotaTracker::new(1);
        assert!(tracker.try_consume(1));
        assert!(tracker.try_consume(0));
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_low_quota_detection() {
        let tracker = QuotaTracker::new(1000);
        assert!(tracker.try_consume(950));
        assert!(tracker.is_low());

        tracker.reset_window();
        assert!(!tracker.is_low());
    }

    #[test]
    fn test_concurrent_consumers_never_overshoot() {
        let tracker = Arc::new(QuotaTracker::new(1000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || (0..200).filter(|_| tracker.try_consume(3)).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(granted, 333);
        assert_eq!(tracker.remaining(), 1);
    }
}
