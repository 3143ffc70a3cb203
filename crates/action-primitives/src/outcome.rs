//! The uniform result object returned by every core operation.

use formpilot_core_types::{code_token, StepName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Retryable: not found, mismatch, modal timeout, stuck step.
    SoftFail,
    /// The run caught an unexpected error.
    HardFail,
}

/// Immutable result value. `error_code` and `evidence` are present iff the
/// status is not `success`; the constructors are the only way to build one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    status: OutcomeStatus,
    stage: String,
    error_code: Option<String>,
    evidence: Option<String>,
    url: Option<String>,
    screenshots: IndexMap<String, String>,
}

impl Outcome {
    pub fn success(stage: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            stage: stage.into(),
            error_code: None,
            evidence: None,
            url: None,
            screenshots: IndexMap::new(),
        }
    }

    /// Soft failure with a stable machine-readable code.
    pub fn error(
        code: impl Into<String>,
        evidence: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            status: OutcomeStatus::SoftFail,
            stage: stage.into(),
            error_code: Some(code.into()),
            evidence: Some(evidence.into()),
            url: None,
            screenshots: IndexMap::new(),
        }
    }

    /// Escalate a failure to `hard_fail`. Successes are returned unchanged.
    pub fn hard(mut self) -> Self {
        if self.status != OutcomeStatus::Success {
            self.status = OutcomeStatus::HardFail;
        }
        self
    }

    /// Stamp the page location observed when the result was produced.
    pub fn at(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_screenshots(mut self, screenshots: IndexMap<String, String>) -> Self {
        self.screenshots = screenshots;
        self
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn evidence(&self) -> Option<&str> {
        self.evidence.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn screenshots(&self) -> &IndexMap<String, String> {
        &self.screenshots
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Stable error codes.
pub mod codes {
    use super::*;

    pub const PAGE_NOT_FOUND: &str = "PAGE_NOT_FOUND";
    pub const NAVIGATION_FAILED: &str = "NAVIGATION_FAILED";
    pub const ADVANCE_NOT_FOUND: &str = "ADVANCE_NOT_FOUND";
    pub const DIRECT_NAVIGATION_FAILED: &str = "DIRECT_NAVIGATION_FAILED";
    pub const STEP_STUCK: &str = "STEP_STUCK";
    pub const UNEXPECTED_ERROR_SUFFIX: &str = "UNEXPECTED_ERROR";

    pub const FIELD_NOT_FOUND: &str = "FIELD_NOT_FOUND";
    pub const FILL_FAILED: &str = "FILL_FAILED";
    pub const OPTION_NOT_FOUND: &str = "OPTION_NOT_FOUND";
    pub const CHECKBOX_FAILED: &str = "CHECKBOX_FAILED";
    pub const SELECTION_FAILED: &str = "SELECTION_FAILED";
    pub const UPLOAD_FAILED: &str = "UPLOAD_FAILED";
    pub const MODAL_NOT_OPENED: &str = "MODAL_NOT_OPENED";
    pub const MODAL_NOT_CLOSED: &str = "MODAL_NOT_CLOSED";

    pub const CAPTCHA_DETECTED: &str = "CAPTCHA_DETECTED";
    pub const OTP_NOT_RECEIVED: &str = "OTP_NOT_RECEIVED";
    pub const PHONE_VERIFICATION_FAILED: &str = "PHONE_VERIFICATION_FAILED";
    pub const LOCATION_STEP_NOT_COMPLETED: &str = "LOCATION_STEP_NOT_COMPLETED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const UNKNOWN_STEP: &str = "UNKNOWN_STEP";
    pub const HANDLER_NOT_REGISTERED: &str = "HANDLER_NOT_REGISTERED";
    pub const UNEXPECTED_ERROR: &str = "UNEXPECTED_ERROR";

    /// `<STEP>_<SUFFIX>`, e.g. `RATE_STEP_STUCK`.
    pub fn step(step: &StepName, suffix: &str) -> String {
        format!("{}_{}", step.code_prefix(), suffix)
    }

    /// `<FIELD>_<SUFFIX>`, e.g. `FIRST_NAME_FILL_FAILED`.
    pub fn field(label: &str, suffix: &str) -> String {
        format!("{}_{}", code_token(label), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_present_iff_not_success() {
        let ok = Outcome::success("rate");
        assert!(ok.error_code().is_none() && ok.evidence().is_none());
        assert_eq!(ok.clone().hard().status(), OutcomeStatus::Success);

        let failed = Outcome::error("RATE_STEP_STUCK", "url unchanged", "rate");
        assert_eq!(failed.status(), OutcomeStatus::SoftFail);
        assert_eq!(failed.error_code(), Some("RATE_STEP_STUCK"));
        assert_eq!(failed.hard().status(), OutcomeStatus::HardFail);
    }

    #[test]
    fn serializes_with_snake_case_status() {
        let mut shots = IndexMap::new();
        shots.insert("before".to_string(), "/tmp/a.png".to_string());
        let outcome = Outcome::error("X", "y", "z")
            .at("https://w.test/a")
            .with_screenshots(shots);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "soft_fail");
        assert_eq!(json["url"], "https://w.test/a");
        assert_eq!(json["screenshots"]["before"], "/tmp/a.png");
    }

    #[test]
    fn codes_use_upper_case_prefixes() {
        assert_eq!(
            codes::step(&StepName::new("work_preference"), codes::STEP_STUCK),
            "WORK_PREFERENCE_STEP_STUCK"
        );
        assert_eq!(
            codes::field("first name", codes::FILL_FAILED),
            "FIRST_NAME_FILL_FAILED"
        );
    }
}
