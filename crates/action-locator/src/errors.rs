//! Error types for the selector catalog

use thiserror::Error;

/// Catalog loading and lookup errors
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// The catalog document could not be read
    #[error("Catalog unreadable: {0}")]
    Io(String),

    /// YAML syntax or shape error
    #[error("Catalog malformed: {0}")]
    Malformed(String),

    /// Declared step table is inconsistent
    #[error("Invalid step table: {0}")]
    InvalidPlan(String),

    /// A field entry is present but has no anchors
    #[error("Field '{0}' has no anchors")]
    EmptyField(String),
}

impl LocatorError {
    /// Catalog errors come from configuration and are never retryable.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
