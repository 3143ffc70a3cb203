//! Flow execution error types

use action_primitives::ActionError;
use formpilot_state_center::StoreError;
use thiserror::Error;

/// Failures that escape the step handlers. The sequencer turns every one of
/// them into a `hard_fail` outcome at its entrypoint.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Page transport failed outside a handler (setup, detection, terminal handling)
    #[error("Action primitive error: {0}")]
    Action(#[from] ActionError),

    /// Persistence collaborator failed on a read the run cannot do without
    #[error("User store error: {0}")]
    Store(#[from] StoreError),

    /// OTP provider failed
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// OTP provider failures. The chain logs them and moves to the next provider.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("otp drop file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("otp provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },
}
