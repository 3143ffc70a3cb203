//! Declared step order and URL-based step detection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{CoreError, StepName};

/// Steps with post-conditions the generic loop does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    /// Needs a settle delay and may open a phone-verification sub-flow.
    Location,
    /// Final screen; completing it completes the run.
    Submit,
}

/// Step entry as it appears in the selector catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: StepName,
    pub fragment: String,
    #[serde(default)]
    pub terminal: Option<TerminalKind>,
    /// Credential submission; followed by a captcha scan.
    #[serde(default)]
    pub credentials: bool,
    /// Session state is persisted after this step completes.
    #[serde(default)]
    pub sensitive: bool,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: StepName::new(name),
            fragment: fragment.into(),
            terminal: None,
            credentials: false,
            sensitive: false,
        }
    }

    pub fn terminal(mut self, kind: TerminalKind) -> Self {
        self.terminal = Some(kind);
        self
    }

    pub fn credentials(mut self) -> Self {
        self.credentials = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// A named phase of the wizard at a fixed position in the declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub name: StepName,
    pub position: usize,
    pub fragment: String,
    pub terminal: Option<TerminalKind>,
    pub credentials: bool,
    pub sensitive: bool,
}

impl StepDescriptor {
    /// Whether the given URL shows this step.
    pub fn matches(&self, url: &str) -> bool {
        url_path(url).contains(self.fragment.as_str())
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

/// Result of matching a live URL against the declared steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedStep {
    Known(usize),
    /// Blank page or the bare wizard root.
    Initial,
    Unknown,
}

impl DetectedStep {
    pub fn index(&self) -> Option<usize> {
        match self {
            DetectedStep::Known(index) => Some(*index),
            _ => None,
        }
    }
}

/// Fixed, ordered sequence of steps. Insertion order is execution order.
#[derive(Debug, Clone, Serialize)]
pub struct StepPlan {
    base_url: String,
    namespace: String,
    steps: Vec<StepDescriptor>,
}

impl StepPlan {
    pub fn new(
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        specs: Vec<StepSpec>,
    ) -> Result<Self, CoreError> {
        if specs.is_empty() {
            return Err(CoreError::InvalidPlan("no steps declared".to_string()));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(specs.len());
        for (position, spec) in specs.into_iter().enumerate() {
            if spec.fragment.trim().is_empty() {
                return Err(CoreError::InvalidPlan(format!(
                    "step '{}' has an empty url fragment",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.clone()) {
                return Err(CoreError::InvalidPlan(format!(
                    "step '{}' declared twice",
                    spec.name
                )));
            }
            steps.push(StepDescriptor {
                name: spec.name,
                position,
                fragment: spec.fragment,
                terminal: spec.terminal,
                credentials: spec.credentials,
                sensitive: spec.sensitive,
            });
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            steps,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn position_of(&self, name: &StepName) -> Option<usize> {
        self.steps.iter().position(|step| &step.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// First step with the given terminal kind.
    pub fn terminal(&self, kind: TerminalKind) -> Option<&StepDescriptor> {
        self.steps.iter().find(|step| step.terminal == Some(kind))
    }

    /// Detect which declared step the URL shows. The longest matching
    /// fragment wins so `/education` never shadows `/education/edit`.
    pub fn detect(&self, url: &str) -> DetectedStep {
        let trimmed = url.trim();
        if trimmed.is_empty() || trimmed == "about:blank" {
            return DetectedStep::Initial;
        }

        let path = url_path(trimmed);
        let best = self
            .steps
            .iter()
            .filter(|step| path.contains(step.fragment.as_str()))
            .max_by_key(|step| step.fragment.len());
        if let Some(step) = best {
            return DetectedStep::Known(step.position);
        }

        if !self.namespace.is_empty()
            && path.trim_end_matches('/') == self.namespace.trim_end_matches('/')
        {
            return DetectedStep::Initial;
        }

        DetectedStep::Unknown
    }

    /// Whether the URL stays inside the wizard.
    pub fn in_namespace(&self, url: &str) -> bool {
        let path = url_path(url);
        (!self.namespace.is_empty() && path.contains(self.namespace.as_str()))
            || self.steps.iter().any(|step| path.contains(step.fragment.as_str()))
    }

    pub fn url_for(&self, index: usize) -> Option<String> {
        self.steps
            .get(index)
            .map(|step| format!("{}{}", self.base_url, step.fragment))
    }

    /// URL of the step declared after `index`, used for direct navigation.
    pub fn next_url_after(&self, index: usize) -> Option<String> {
        self.url_for(index + 1)
    }
}

fn url_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> StepPlan {
        StepPlan::new(
            "https://wizard.test/",
            "/create-profile/",
            vec![
                StepSpec::new("account", "/signup").credentials(),
                StepSpec::new("experience", "/create-profile/experience"),
                StepSpec::new("education", "/create-profile/education"),
                StepSpec::new("education_edit", "/create-profile/education/edit"),
                StepSpec::new("location", "/create-profile/location")
                    .terminal(TerminalKind::Location),
                StepSpec::new("submit", "/create-profile/submit").terminal(TerminalKind::Submit),
            ],
        )
        .unwrap()
    }

    #[test]
    fn detects_known_steps_by_path() {
        let plan = plan();
        assert_eq!(
            plan.detect("https://wizard.test/create-profile/experience?ref=x"),
            DetectedStep::Known(1)
        );
        assert_eq!(
            plan.detect("https://wizard.test/create-profile/education/edit"),
            DetectedStep::Known(3)
        );
    }

    #[test]
    fn blank_and_root_pages_are_initial() {
        let plan = plan();
        assert_eq!(plan.detect("about:blank"), DetectedStep::Initial);
        assert_eq!(plan.detect(""), DetectedStep::Initial);
        assert_eq!(
            plan.detect("https://wizard.test/create-profile/"),
            DetectedStep::Initial
        );
        assert_eq!(
            plan.detect("https://wizard.test/dashboard"),
            DetectedStep::Unknown
        );
    }

    #[test]
    fn query_strings_do_not_fake_a_step() {
        let plan = plan();
        assert_eq!(
            plan.detect("https://wizard.test/home?next=/create-profile/submit"),
            DetectedStep::Unknown
        );
    }

    #[test]
    fn computes_step_urls() {
        let plan = plan();
        assert_eq!(
            plan.url_for(1).as_deref(),
            Some("https://wizard.test/create-profile/experience")
        );
        assert_eq!(
            plan.next_url_after(4).as_deref(),
            Some("https://wizard.test/create-profile/submit")
        );
        assert!(plan.next_url_after(5).is_none());
        assert_eq!(plan.terminal(TerminalKind::Location).unwrap().position, 4);
    }

    #[test]
    fn rejects_duplicate_steps() {
        let err = StepPlan::new(
            "https://wizard.test",
            "/w/",
            vec![StepSpec::new("a", "/w/a"), StepSpec::new("a", "/w/b")],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPlan(_)));
    }

    #[test]
    fn namespace_includes_declared_fragments() {
        let plan = plan();
        assert!(plan.in_namespace("https://wizard.test/create-profile/anything"));
        assert!(plan.in_namespace("https://wizard.test/signup"));
        assert!(!plan.in_namespace("https://wizard.test/login"));
    }
}
