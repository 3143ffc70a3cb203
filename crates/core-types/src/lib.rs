//! Shared primitives for the formpilot wizard runner.
//!
//! Everything here is plain data: identifiers, the per-run option flags and
//! the declared step plan that the sequencer walks.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod plan;

pub use plan::{DetectedStep, StepDescriptor, StepPlan, StepSpec, TerminalKind};

/// Errors raised while building or querying shared types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("invalid step plan: {0}")]
    InvalidPlan(String),
}

/// Identifier of a single wizard run.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the user whose profile is being created.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical name of a wizard step ("experience", "rate", ...).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased token used as the prefix of step error codes.
    pub fn code_prefix(&self) -> String {
        code_token(&self.0)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for StepName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Turn a free-form label into a stable machine token: `work preference` -> `WORK_PREFERENCE`.
pub fn code_token(label: &str) -> String {
    let mut token = String::with_capacity(label.len());
    let mut last_sep = true;
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            token.push(ch.to_ascii_uppercase());
            last_sep = false;
        } else if !last_sep {
            token.push('_');
            last_sep = true;
        }
    }
    while token.ends_with('_') {
        token.pop();
    }
    token
}

/// Flags for a single run. Passed by reference down the whole call chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Only verify data a previous run entered; never re-enter it.
    #[serde(default)]
    pub upload_only: bool,

    /// Skip the phone-verification challenge and go straight to submission.
    #[serde(default)]
    pub skip_otp: bool,

    /// Stop right after the rate screen and persist the rate milestone.
    #[serde(default)]
    pub defer_location: bool,

    /// Jump to this step before starting the loop.
    #[serde(default)]
    pub force_step: Option<StepName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_token_normalizes_separators() {
        assert_eq!(code_token("work preference"), "WORK_PREFERENCE");
        assert_eq!(code_token("resume-import"), "RESUME_IMPORT");
        assert_eq!(code_token("  rate  "), "RATE");
        assert_eq!(StepName::from("b").code_prefix(), "B");
    }

    #[test]
    fn run_options_default_to_full_run() {
        let opts: RunOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, RunOptions::default());
        assert!(opts.force_step.is_none());
    }
}
