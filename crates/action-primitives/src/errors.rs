//! Error types for action primitives
//!
//! Expected conditions (element not found, value mismatch) are reported as
//! failed [`Outcome`](crate::Outcome)s. `ActionError` is reserved for genuine
//! transport or internal failures; step handlers convert it to `hard_fail`.

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Transport-level and internal failures of action primitives
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Navigation timed out waiting for page load
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// A bounded wait expired
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Element handle went stale between resolution and use
    #[error("Element detached: {0}")]
    Detached(String),

    /// In-page script failed
    #[error("Script error: {0}")]
    Script(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Local file system error (screenshots, uploads)
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_)
                | ActionError::NavTimeout(_)
                | ActionError::Detached(_)
                | ActionError::CdpIo(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::NavTimeout(_) | ActionError::CdpIo(_) | ActionError::Io(_) => 2,
            ActionError::WaitTimeout(_) | ActionError::Detached(_) => 1,
            ActionError::Script(_) => 0,
        }
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(message),
            AdapterErrorKind::TargetNotFound => ActionError::Detached(message),
            AdapterErrorKind::Script => ActionError::Script(message),
            AdapterErrorKind::CdpIo => ActionError::CdpIo(message),
            AdapterErrorKind::Internal => ActionError::Internal(message),
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::Io(err.to_string())
    }
}
