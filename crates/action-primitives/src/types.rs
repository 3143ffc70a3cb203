//! Core data types for action primitives

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inclusive bounds of a randomized delay, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms.min(self.max_ms))
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms.max(self.min_ms))
    }
}

/// Timeouts, cadences and pacing bounds used by every primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Cadence of selector-retry polls
    pub poll_interval_ms: u64,

    /// Default selector-retry timeout
    pub selector_timeout_ms: u64,

    /// Timeout for slow fields (password, uploads, modals)
    pub long_timeout_ms: u64,

    /// Navigation deadline
    pub navigation_timeout_ms: u64,

    /// Delay after every click/type action
    pub action_delay: DelayRange,

    /// Delay between typed characters
    pub typing_delay: DelayRange,

    /// Delay between typed password characters
    pub password_typing_delay: DelayRange,

    /// Settle delay after the location step
    pub settle_ms: u64,

    /// Network quiet period for the idle tier
    pub network_quiet_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            selector_timeout_ms: 10_000,
            long_timeout_ms: 20_000,
            navigation_timeout_ms: 30_000,
            action_delay: DelayRange::new(300, 900),
            typing_delay: DelayRange::new(40, 120),
            password_typing_delay: DelayRange::new(120, 260),
            settle_ms: 3_000,
            network_quiet_ms: 500,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_millis(self.long_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn network_quiet(&self) -> Duration {
        Duration::from_millis(self.network_quiet_ms)
    }
}

/// The one retry budget shared by every bounded loop in the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Attempts, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retrying after failed `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        // Exponential backoff: backoff_ms * 2^(attempt-1)
        let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1));
        let total_ms = self.backoff_ms.saturating_mul(multiplier);
        Duration::from_millis(total_ms.min(self.max_backoff_ms))
    }
}

/// Built-in waiting tiers applied after an action
///
/// - None: No waiting
/// - DomReady: a single poll interval for the DOM to react
/// - Idle: wait for network quiet (navigation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WaitTier {
    None,
    #[default]
    DomReady,
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(40), Duration::from_millis(10_000));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn delay_range_orders_bounds() {
        let range = DelayRange::new(900, 300);
        assert!(range.min() <= range.max());
    }
}
