//! Step handler contract: one unit per wizard screen.

use action_locator::SelectorCatalog;
use action_primitives::{codes, ActionError, Outcome, RunCtx};
use async_trait::async_trait;
use formpilot_core_types::{RunOptions, StepDescriptor, StepPlan};
use formpilot_state_center::{ProfileData, UserRecord};

use crate::navigation::Navigator;

/// What a handler gets to work with: the run context, the user being
/// onboarded and the descriptor of the screen it owns.
#[derive(Clone, Copy)]
pub struct StepEnv<'a> {
    pub ctx: &'a RunCtx,
    pub user: &'a UserRecord,
    pub step: &'a StepDescriptor,
}

impl<'a> StepEnv<'a> {
    pub fn new(ctx: &'a RunCtx, user: &'a UserRecord, step: &'a StepDescriptor) -> Self {
        Self { ctx, user, step }
    }

    /// Stage label carried by every outcome the handler produces.
    pub fn stage(&self) -> &'a str {
        self.step.name.as_str()
    }

    pub fn profile(&self) -> &'a ProfileData {
        &self.user.profile
    }

    pub fn catalog(&self) -> &'a SelectorCatalog {
        self.ctx.catalog()
    }

    pub fn plan(&self) -> &'a StepPlan {
        self.ctx.catalog().plan()
    }

    pub fn navigator(&self) -> Navigator<'a> {
        Navigator::new(self.ctx)
    }

    /// `<STEP>_<SUFFIX>` soft failure for this step.
    pub fn fail(&self, suffix: &str, evidence: impl Into<String>) -> Outcome {
        Outcome::error(codes::step(&self.step.name, suffix), evidence, self.stage())
    }

    /// Catalog key scoped to this step: `rate` + `edit` -> `rate.edit`.
    pub fn key(&self, field: &str) -> String {
        format!("{}.{field}", self.step.name)
    }
}

/// One polymorphic unit per wizard screen. Must return exactly one
/// [`Outcome`]; `Err` is reserved for transport failures and becomes
/// `<STEP>_UNEXPECTED_ERROR` at the sequencer.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Name of the step this handler owns.
    fn name(&self) -> &str;

    async fn execute(
        &self,
        env: &StepEnv<'_>,
        options: &RunOptions,
    ) -> Result<Outcome, ActionError>;
}

/// Field-entry half of a form handler, plugged into the execution templates.
#[async_trait]
pub trait FormFill: Send + Sync {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError>;
}

/// Short-circuit on a failed sub-outcome.
#[macro_export]
macro_rules! ensure_success {
    ($outcome:expr) => {{
        let outcome: ::action_primitives::Outcome = $outcome;
        if !outcome.is_success() {
            return Ok(outcome);
        }
    }};
}
