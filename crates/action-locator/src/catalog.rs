use std::collections::HashMap;
use std::path::Path;

use cdp_adapter::AnchorDescriptor;
use formpilot_core_types::{StepName, StepPlan, StepSpec};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::LocatorError;

const EMBEDDED_CATALOG: &str = include_str!("../catalog/default.yaml");

/// Key holding the generic advance controls.
pub const ADVANCE_FIELD: &str = "nav.advance";

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    wizard: WizardDoc,
    steps: Vec<StepSpec>,
    #[serde(default)]
    captcha_markers: Vec<String>,
    #[serde(default)]
    error_markers: Vec<String>,
    #[serde(default)]
    fields: HashMap<String, Vec<AnchorDescriptor>>,
}

#[derive(Debug, Deserialize)]
struct WizardDoc {
    base_url: String,
    namespace: String,
}

/// Prioritized anchor lists per logical field plus the declared step table.
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    plan: StepPlan,
    fields: HashMap<String, Vec<AnchorDescriptor>>,
    captcha_markers: Vec<String>,
    error_markers: Vec<String>,
}

impl SelectorCatalog {
    /// Catalog compiled into the binary.
    pub fn embedded() -> Result<Self, LocatorError> {
        Self::from_yaml_str(EMBEDDED_CATALOG)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, LocatorError> {
        let doc: CatalogDoc =
            serde_yaml::from_str(raw).map_err(|err| LocatorError::Malformed(err.to_string()))?;

        if let Some((key, _)) = doc.fields.iter().find(|(_, anchors)| anchors.is_empty()) {
            return Err(LocatorError::EmptyField(key.clone()));
        }

        let plan = StepPlan::new(doc.wizard.base_url, doc.wizard.namespace, doc.steps)
            .map_err(|err| LocatorError::InvalidPlan(err.to_string()))?;

        debug!(
            target: "action-locator",
            steps = plan.len(),
            fields = doc.fields.len(),
            "selector catalog parsed"
        );

        Ok(Self {
            plan,
            fields: doc.fields,
            captcha_markers: lowercase(doc.captcha_markers),
            error_markers: lowercase(doc.error_markers),
        })
    }

    pub fn load(path: &Path) -> Result<Self, LocatorError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| LocatorError::Io(format!("{}: {err}", path.display())))?;
        let catalog = Self::from_yaml_str(&raw)?;
        info!(target: "action-locator", path = %path.display(), "selector catalog loaded");
        Ok(catalog)
    }

    /// Override file when given, embedded catalog otherwise.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, LocatorError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    /// Point the step table at a different deployment of the wizard.
    pub fn with_base_url(self, base_url: &str) -> Result<Self, LocatorError> {
        let specs = self
            .plan
            .iter()
            .map(|step| StepSpec {
                name: step.name.clone(),
                fragment: step.fragment.clone(),
                terminal: step.terminal,
                credentials: step.credentials,
                sensitive: step.sensitive,
            })
            .collect();
        let plan = StepPlan::new(base_url, self.plan.namespace(), specs)
            .map_err(|err| LocatorError::InvalidPlan(err.to_string()))?;
        Ok(Self { plan, ..self })
    }

    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    /// Anchors for a logical field, in priority order. Unknown keys yield an
    /// empty list, which callers report as not-found.
    pub fn field(&self, key: &str) -> Vec<AnchorDescriptor> {
        self.fields.get(key).cloned().unwrap_or_default()
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Step-specific advance controls first, then the generic ones.
    pub fn advance_anchors(&self, step: &StepName) -> Vec<AnchorDescriptor> {
        let mut anchors = self.field(&format!("{}.advance", step.as_str()));
        for anchor in self.field(ADVANCE_FIELD) {
            if !anchors.contains(&anchor) {
                anchors.push(anchor);
            }
        }
        anchors
    }

    pub fn captcha_markers(&self) -> &[String] {
        &self.captcha_markers
    }

    pub fn error_markers(&self) -> &[String] {
        &self.error_markers
    }

    /// First captcha marker contained in the page text.
    pub fn captcha_marker_in(&self, page_text: &str) -> Option<&str> {
        find_marker(&self.captcha_markers, page_text)
    }

    /// First error-banner marker contained in the page text.
    pub fn error_marker_in(&self, page_text: &str) -> Option<&str> {
        find_marker(&self.error_markers, page_text)
    }
}

fn lowercase(markers: Vec<String>) -> Vec<String> {
    markers
        .into_iter()
        .map(|marker| marker.trim().to_lowercase())
        .filter(|marker| !marker.is_empty())
        .collect()
}

fn find_marker<'a>(markers: &'a [String], page_text: &str) -> Option<&'a str> {
    let haystack = page_text.to_lowercase();
    markers
        .iter()
        .find(|marker| haystack.contains(marker.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::{DetectedStep, TerminalKind};
    use std::io::Write;

    #[test]
    fn embedded_catalog_is_consistent() {
        let catalog = SelectorCatalog::embedded().unwrap();
        let plan = catalog.plan();
        assert_eq!(plan.get(0).unwrap().name, "account");
        assert!(plan.get(0).unwrap().credentials);
        assert_eq!(
            plan.terminal(TerminalKind::Submit).unwrap().name,
            "submit"
        );
        assert_eq!(
            plan.detect("https://www.freelance-market.test/nx/create-profile/rate"),
            DetectedStep::Known(plan.position_of(&StepName::new("rate")).unwrap())
        );
        assert!(!catalog.field("account.password").is_empty());
    }

    #[test]
    fn advance_anchors_put_step_specific_controls_first() {
        let catalog = SelectorCatalog::embedded().unwrap();
        let anchors = catalog.advance_anchors(&StepName::new("welcome"));
        assert_eq!(anchors[0], AnchorDescriptor::css("button[data-qa=\"get-started-btn\"]"));
        assert!(anchors.contains(&AnchorDescriptor::aria("button", "Next")));

        let generic = catalog.advance_anchors(&StepName::new("experience"));
        assert_eq!(generic, catalog.field(ADVANCE_FIELD));
    }

    #[test]
    fn missing_fields_are_empty_not_errors() {
        let catalog = SelectorCatalog::embedded().unwrap();
        assert!(catalog.field("no.such.field").is_empty());
        assert!(!catalog.has_field("no.such.field"));
    }

    #[test]
    fn markers_match_case_insensitively() {
        let catalog = SelectorCatalog::embedded().unwrap();
        assert_eq!(
            catalog.captcha_marker_in("Please VERIFY YOU ARE HUMAN to continue"),
            Some("verify you are human")
        );
        assert!(catalog.captcha_marker_in("Welcome aboard").is_none());
        assert!(catalog.error_marker_in("Oops, something went wrong").is_some());
    }

    #[test]
    fn override_file_and_base_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "wizard: {{ base_url: 'https://a.test', namespace: /w/ }}\n\
             steps:\n  - {{ name: a, fragment: /w/a }}\n  - {{ name: b, fragment: /w/b, terminal: submit }}\n\
             fields:\n  nav.advance: ['text=:Go']\n"
        )
        .unwrap();
        let catalog = SelectorCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.plan().url_for(1).as_deref(), Some("https://a.test/w/b"));
        assert_eq!(catalog.field(ADVANCE_FIELD), vec![AnchorDescriptor::exact_text("Go")]);

        let moved = catalog.with_base_url("https://b.test/").unwrap();
        assert_eq!(moved.plan().url_for(0).as_deref(), Some("https://b.test/w/a"));
    }

    #[test]
    fn rejects_empty_field_lists() {
        let raw = "wizard: { base_url: 'https://a.test', namespace: /w/ }\n\
                   steps: [ { name: a, fragment: /w/a } ]\n\
                   fields: { x.y: [] }\n";
        let err = SelectorCatalog::from_yaml_str(raw).unwrap_err();
        assert!(matches!(err, LocatorError::EmptyField(key) if key == "x.y"));
    }
}
