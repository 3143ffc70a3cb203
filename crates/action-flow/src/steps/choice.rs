use action_forms::{ensure_checked, select_with_verification};
use action_primitives::{ActionError, Outcome};
use async_trait::async_trait;
use cdp_adapter::AnchorDescriptor;
use formpilot_core_types::RunOptions;
use formpilot_state_center::ProfileData;
use tracing::debug;

use crate::ensure_success;
use crate::handler::{FormFill, StepEnv, StepHandler};
use crate::templates::fill_then_advance;

/// Single-choice radio screen ("experience", "goal"). The profile value
/// picks the option by its label; `<step>.fallback` is used when the
/// profile has none or the label is not on the page.
pub struct ChoiceHandler {
    name: &'static str,
    value: fn(&ProfileData) -> &str,
}

impl ChoiceHandler {
    pub fn new(name: &'static str, value: fn(&ProfileData) -> &str) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl FormFill for ChoiceHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let wanted = (self.value)(env.profile()).trim();
        let mut anchors = Vec::new();
        if !wanted.is_empty() {
            anchors.push(AnchorDescriptor::aria("radio", wanted));
            anchors.push(AnchorDescriptor::text(wanted));
        }
        anchors.extend(env.catalog().field(&env.key("fallback")));
        select_with_verification(env.ctx, &anchors, self.name, env.stage()).await
    }
}

#[async_trait]
impl StepHandler for ChoiceHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        fill_then_advance(env, options, self).await
    }
}

/// Multi-choice checkbox screen ("work_preference").
pub struct PreferenceHandler;

#[async_trait]
impl FormFill for PreferenceHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let preferences = &env.profile().work_preferences;
        if preferences.is_empty() {
            debug!("no work preferences on record");
        }
        for preference in preferences.iter().filter(|p| !p.trim().is_empty()) {
            let anchors = [
                AnchorDescriptor::aria("checkbox", preference.as_str()),
                AnchorDescriptor::text(preference.as_str()),
            ];
            ensure_success!(ensure_checked(env.ctx, &anchors, "work_preference", env.stage()).await?);
        }
        Ok(Outcome::success(env.stage()))
    }
}

#[async_trait]
impl StepHandler for PreferenceHandler {
    fn name(&self) -> &str {
        "work_preference"
    }

    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        fill_then_advance(env, options, self).await
    }
}
