//! Injectable time source for human-like pacing.
//!
//! Delays are for plausibility only; nothing relies on them for ordering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use crate::types::DelayRange;

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend for a uniformly random duration within `range`.
    async fn pause(&self, range: DelayRange);

    /// Suspend for exactly `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real-time pacer backed by tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HumanPacer;

#[async_trait]
impl Pacer for HumanPacer {
    async fn pause(&self, range: DelayRange) {
        let millis = {
            let (low, high) = (range.min().as_millis() as u64, range.max().as_millis() as u64);
            rand::thread_rng().gen_range(low..=high)
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Zero-delay pacer for tests. Counts calls and records requested sleeps.
#[derive(Debug, Default)]
pub struct InstantPacer {
    pauses: AtomicUsize,
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Total time callers asked to sleep.
    pub fn slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Pacer for InstantPacer {
    async fn pause(&self, _range: DelayRange) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instant_pacer_records_without_waiting() {
        let pacer = InstantPacer::new();
        let started = std::time::Instant::now();
        pacer.pause(DelayRange::new(5_000, 6_000)).await;
        pacer.sleep(Duration::from_secs(30)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(pacer.pauses(), 1);
        assert_eq!(pacer.slept(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn human_pacer_waits_at_least_the_lower_bound() {
        let started = std::time::Instant::now();
        HumanPacer.pause(DelayRange::new(20, 40)).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(2));
    }
}
