//! Wall-clock aligned periodic timers for window resets

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time until the next multiple of `period` since the Unix epoch
///
/// A `now` sitting exactly on a boundary waits a full period.
pub fn delay_to_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_ms = period.as_millis().max(1) as i64;
    let elapsed = now.timestamp_millis().rem_euclid(period_ms);
    Duration::from_millis((period_ms - elapsed) as u64)
}

/// Run `tick` every `period`, first firing on the next aligned boundary
pub fn spawn_aligned<F>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    let delay = delay_to_boundary(Utc::now(), period);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + delay, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(timer = name, first_tick_ms = delay.as_millis() as u64, "Timer scheduled");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(timer = name, "Timer stopped");
                    break;
                }
                _ = interval.tick() => tick(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_to_next_second() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_250).unwrap();
        assert_eq!(
            delay_to_boundary(now, Duration::from_secs(1)),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn test_delay_to_next_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 59, 30).unwrap();
        assert_eq!(
            delay_to_boundary(now, Duration::from_secs(3600)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_on_boundary_waits_full_period() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(
            delay_to_boundary(now, Duration::from_secs(3600)),
            Duration::from_secs(3600)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_and_stops() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let counter = Arc::clone(&ticks);
        let handle = spawn_aligned("test", Duration::from_secs(1), shutdown.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // First boundary is at most one period away, then one tick per period
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!((3..=4).contains(&seen), "unexpected tick count {seen}");

        shutdown.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }
}
