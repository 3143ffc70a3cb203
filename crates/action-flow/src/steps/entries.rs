use action_forms::{
    close_modal, ensure_checked, fill_and_verify, fill_optional, open_modal, save_modal, ModalSpec,
};
use action_primitives::{find_now, ActionError, Outcome, RunCtx};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use formpilot_state_center::{EducationEntry, EmploymentEntry};
use tracing::{info, instrument};

use crate::ensure_success;
use crate::handler::{StepEnv, StepHandler};
use crate::templates::validate_page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Employment,
    Education,
}

impl EntryKind {
    fn step(self) -> &'static str {
        match self {
            EntryKind::Employment => "employment",
            EntryKind::Education => "education",
        }
    }

    fn modal(self) -> ModalSpec<'static> {
        match self {
            EntryKind::Employment => {
                ModalSpec::new("employment", "employment.add").titled("employment.modal_title")
            }
            EntryKind::Education => {
                ModalSpec::new("education", "education.add").titled("education.modal_title")
            }
        }
    }
}

/// Repeatable-entry screen. Existing entries mean an earlier run already
/// filled it: just advance. Otherwise add every entry on record through the
/// modal, then advance.
pub struct EntriesHandler {
    kind: EntryKind,
}

impl EntriesHandler {
    pub fn new(kind: EntryKind) -> Self {
        Self { kind }
    }

    async fn add_entries(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let profile = env.profile();
        let count = match self.kind {
            EntryKind::Employment => profile.employment.len(),
            EntryKind::Education => profile.education.len(),
        };
        for index in 0..count {
            let spec = self.kind.modal();
            ensure_success!(open_modal(env.ctx, spec, env.stage()).await?);
            let filled = match self.kind {
                EntryKind::Employment => {
                    fill_employment(env.ctx, &profile.employment[index], env.stage()).await?
                }
                EntryKind::Education => {
                    fill_education(env.ctx, &profile.education[index], env.stage()).await?
                }
            };
            if !filled.is_success() {
                // leave the page usable for the next attempt
                close_modal(env.ctx, spec, env.stage()).await?;
                return Ok(filled);
            }
            ensure_success!(save_modal(env.ctx, spec, env.stage()).await?);
            info!(step = self.kind.step(), entry = index + 1, "entry saved");
        }
        Ok(Outcome::success(env.stage()))
    }
}

#[async_trait]
impl StepHandler for EntriesHandler {
    fn name(&self) -> &str {
        self.kind.step()
    }

    #[instrument(skip_all, fields(run = %env.ctx.run_id(), step = %env.step.name))]
    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        if let Some(wrong_page) = validate_page(env).await? {
            return Ok(wrong_page);
        }
        let navigator = env.navigator();

        let existing = env.catalog().field(&env.key("existing"));
        if find_now(env.ctx, &existing).await?.is_some() {
            info!("entries already present");
            return navigator.advance(env.step).await;
        }
        if !options.upload_only {
            ensure_success!(self.add_entries(env).await?);
        }
        navigator.advance(env.step).await
    }
}

async fn fill_employment(
    ctx: &RunCtx,
    entry: &EmploymentEntry,
    stage: &str,
) -> Result<Outcome, ActionError> {
    ensure_success!(fill_and_verify(ctx, "employment.title", &entry.title, stage).await?);
    ensure_success!(fill_and_verify(ctx, "employment.company", &entry.company, stage).await?);
    ensure_success!(fill_optional(ctx, "employment.location", &entry.location, stage).await?);
    ensure_success!(fill_and_verify(ctx, "employment.start_year", &entry.start_year, stage).await?);
    match entry.end_year.as_deref() {
        Some(end) => {
            ensure_success!(fill_and_verify(ctx, "employment.end_year", end, stage).await?)
        }
        None => {
            let current = ctx.catalog().field("employment.current");
            ensure_success!(ensure_checked(ctx, &current, "current", stage).await?)
        }
    }
    fill_optional(ctx, "employment.description", &entry.description, stage).await
}

async fn fill_education(
    ctx: &RunCtx,
    entry: &EducationEntry,
    stage: &str,
) -> Result<Outcome, ActionError> {
    ensure_success!(fill_and_verify(ctx, "education.school", &entry.school, stage).await?);
    ensure_success!(fill_optional(ctx, "education.degree", &entry.degree, stage).await?);
    ensure_success!(
        fill_optional(ctx, "education.field_of_study", &entry.field_of_study, stage).await?
    );
    ensure_success!(fill_optional(ctx, "education.start_year", &entry.start_year, stage).await?);
    fill_optional(ctx, "education.end_year", &entry.end_year, stage).await
}
