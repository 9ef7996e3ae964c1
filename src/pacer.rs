//! Frame-rate pacing.
//!
//! The pacer keeps a producer from looping faster than its target rate.
//! It gives no hard real-time guarantee: an iteration that overruns the
//! period is followed immediately by the next one, with no frame dropping
//! and no catch-up.

use std::time::{Duration, Instant};

/// Sleeps out the remainder of a fixed frame period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    period: Option<Duration>,
}

impl Pacer {
    /// Creates a pacer for `framerate` frames per second; 0 disables pacing.
    pub fn new(framerate: u32) -> Self {
        let period = (framerate > 0).then(|| Duration::from_secs(1) / framerate);
        Self { period }
    }

    /// A pacer that never sleeps.
    pub fn unlimited() -> Self {
        Self { period: None }
    }

    /// Target iteration period, or `None` when pacing is disabled.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Time left in the period after an iteration that took `elapsed`.
    ///
    /// Returns `None` when pacing is disabled and `Some(Duration::ZERO)`
    /// when the iteration overran.
    pub fn sleep_time(&self, elapsed: Duration) -> Option<Duration> {
        self.period.map(|period| period.saturating_sub(elapsed))
    }

    /// Blocks the current thread for the remainder of the period that
    /// began at `started`.
    pub fn pace_blocking(&self, started: Instant) {
        if let Some(remaining) = self.sleep_time(started.elapsed()) {
            if !remaining.is_zero() {
                std::thread::sleep(remaining);
            }
        }
    }

    /// Async counterpart of [`Pacer::pace_blocking`], sleeping on the tokio timer.
    pub async fn pace(&self, started: Instant) {
        if let Some(remaining) = self.sleep_time(started.elapsed()) {
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_framerate_disables_pacing() {
        let pacer = Pacer::new(0);
        assert_eq!(pacer.period(), None);
        assert_eq!(pacer.sleep_time(Duration::ZERO), None);
        assert_eq!(pacer.sleep_time(Duration::from_secs(10)), None);
        assert_eq!(pacer, Pacer::unlimited());
    }

    #[test]
    fn test_sleeps_remainder_of_period() {
        let pacer = Pacer::new(50);
        assert_eq!(pacer.period(), Some(Duration::from_millis(20)));
        assert_eq!(
            pacer.sleep_time(Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
        assert_eq!(pacer.sleep_time(Duration::ZERO), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_overrun_sleeps_zero() {
        let pacer = Pacer::new(60);
        let period = pacer.period().unwrap();
        assert_eq!(pacer.sleep_time(period), Some(Duration::ZERO));
        assert_eq!(
            pacer.sleep_time(period + Duration::from_millis(40)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_pace_blocking_waits_out_period() {
        let pacer = Pacer::new(20);
        let started = Instant::now();
        pacer.pace_blocking(started);
        let waited = started.elapsed();

        assert!(waited >= Duration::from_millis(50), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(500), "waited {:?}", waited);
    }

    #[tokio::test]
    async fn test_async_pace_waits_out_period() {
        let pacer = Pacer::new(40);
        let started = Instant::now();
        pacer.pace(started).await;
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_unlimited_pace_returns_immediately() {
        let started = Instant::now();
        Pacer::unlimited().pace_blocking(started);
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
