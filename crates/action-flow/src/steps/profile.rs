use action_forms::{choose_typeahead, fill_and_verify, select_dropdown, TypeaheadMode};
use action_primitives::{ActionError, Outcome};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use formpilot_state_center::ProfileData;
use tracing::debug;

use crate::ensure_success;
use crate::handler::{FormFill, StepEnv, StepHandler};
use crate::templates::{fill_then_advance, try_advance_before_fill};

/// One text field, entered only if advancing fails ("title", "overview",
/// "rate"). An `<step>.edit` control is clicked first when present.
pub struct TextFieldHandler {
    name: &'static str,
    field: &'static str,
    value: fn(&ProfileData) -> &str,
}

impl TextFieldHandler {
    pub fn new(name: &'static str, field: &'static str, value: fn(&ProfileData) -> &str) -> Self {
        Self { name, field, value }
    }
}

#[async_trait]
impl FormFill for TextFieldHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        fill_and_verify(env.ctx, self.field, (self.value)(env.profile()), env.stage()).await
    }
}

#[async_trait]
impl StepHandler for TextFieldHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        try_advance_before_fill(env, options, self).await
    }
}

/// Multi-select typeahead screen ("skills", "categories"): every value
/// becomes a chip.
pub struct ChipsHandler {
    name: &'static str,
    field: &'static str,
    values: fn(&ProfileData) -> &[String],
}

impl ChipsHandler {
    pub fn new(
        name: &'static str,
        field: &'static str,
        values: fn(&ProfileData) -> &[String],
    ) -> Self {
        Self {
            name,
            field,
            values,
        }
    }
}

#[async_trait]
impl FormFill for ChipsHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        for value in (self.values)(env.profile())
            .iter()
            .filter(|v| !v.trim().is_empty())
        {
            ensure_success!(
                choose_typeahead(env.ctx, self.field, value, TypeaheadMode::Chip, env.stage())
                    .await?
            );
        }
        Ok(Outcome::success(env.stage()))
    }
}

#[async_trait]
impl StepHandler for ChipsHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        fill_then_advance(env, options, self).await
    }
}

/// Languages screen: proficiency of the primary language.
pub struct LanguagesHandler;

#[async_trait]
impl FormFill for LanguagesHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let Some(primary) = env.profile().languages.first() else {
            debug!("no languages on record; keeping the page default");
            return Ok(Outcome::success(env.stage()));
        };
        if primary.proficiency.trim().is_empty() {
            return Ok(Outcome::success(env.stage()));
        }
        select_dropdown(
            env.ctx,
            "languages.proficiency",
            Some("languages.proficiency_search"),
            &primary.proficiency,
            env.stage(),
        )
        .await
    }
}

#[async_trait]
impl StepHandler for LanguagesHandler {
    fn name(&self) -> &str {
        "languages"
    }

    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        fill_then_advance(env, options, self).await
    }
}
