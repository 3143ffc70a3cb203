//! Failure handling strategies

use std::time::Duration;

use action_primitives::{Outcome, OutcomeStatus, RetryPolicy};

/// What the sequencer does with a failed step outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStrategy {
    /// Propagate the failure unchanged
    Abort,

    /// Run the step again while the page still shows it
    Retry { max_attempts: u32 },
}

impl FailureStrategy {
    /// Steps the sequencer realigned to get the retry budget; steps on the
    /// declared path fail fast and leave re-invocation to the caller.
    pub fn for_step(realigned: bool, policy: &RetryPolicy) -> Self {
        if realigned {
            FailureStrategy::Retry {
                max_attempts: policy.attempts(),
            }
        } else {
            FailureStrategy::Abort
        }
    }

    /// Whether a failed `outcome` from attempt `attempt` (1-based) should be
    /// retried. Hard failures never are.
    pub fn should_retry(&self, outcome: &Outcome, attempt: u32) -> bool {
        match self {
            FailureStrategy::Abort => false,
            FailureStrategy::Retry { max_attempts } => {
                outcome.status() == OutcomeStatus::SoftFail && attempt < *max_attempts
            }
        }
    }
}

/// Delay before the next attempt.
pub fn calculate_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy.backoff(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        let soft = Outcome::error("A_FIELD_NOT_FOUND", "missing", "a");
        let hard = soft.clone().hard();

        let abort = FailureStrategy::for_step(false, &policy);
        assert_eq!(abort, FailureStrategy::Abort);
        assert!(!abort.should_retry(&soft, 1));

        let retry = FailureStrategy::for_step(true, &policy);
        assert_eq!(retry, FailureStrategy::Retry { max_attempts: 3 });
        assert!(retry.should_retry(&soft, 1));
        assert!(retry.should_retry(&soft, 2));
        assert!(!retry.should_retry(&soft, 3));
        assert!(!retry.should_retry(&hard, 1));
    }

    #[test]
    fn test_calculate_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_ms: 1000,
            max_backoff_ms: 60_000,
        };
        assert_eq!(calculate_backoff(&policy, 1).as_millis(), 1000);
        assert_eq!(calculate_backoff(&policy, 2).as_millis(), 2000);
        assert_eq!(calculate_backoff(&policy, 3).as_millis(), 4000);
        assert_eq!(calculate_backoff(&policy, 10).as_millis(), 60_000);
    }
}
