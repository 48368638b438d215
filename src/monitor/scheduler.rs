//! Cycle pacing

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Paces monitor cycles
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next cycle; `false` ends the run
    async fn tick(&mut self) -> bool;
}

/// Ticks every `period`, forever.
///
/// The first tick completes immediately. A cycle that overruns the period
/// delays the following ticks instead of bursting to catch up, so cycles
/// never overlap.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Create a ticker with the given period
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks a fixed number of times without waiting
#[derive(Debug, Clone, Copy)]
pub struct FixedTicks {
    remaining: usize,
}

impl FixedTicks {
    /// Create a ticker allowing `count` cycles
    pub fn new(count: usize) -> Self {
        Self { remaining: count }
    }
}

#[async_trait]
impl Ticker for FixedTicks {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_fixed_ticks() {
        let mut ticker = FixedTicks::new(2);
        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_paces_cycles() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(1));
        let start = Instant::now();

        assert!(ticker.tick().await);
        assert!(start.elapsed() < Duration::from_millis(10));

        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_does_not_burst_after_overrun() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(1));
        ticker.tick().await;

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let resumed = Instant::now();
        ticker.tick().await;
        ticker.tick().await;

        assert!(resumed.elapsed() >= Duration::from_secs(1));
    }
}
