use action_forms::{ensure_checked, fill_and_verify, fill_password, select_dropdown};
use action_primitives::{ActionError, Outcome};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use tracing::instrument;

use crate::ensure_success;
use crate::handler::{FormFill, StepEnv, StepHandler};
use crate::templates::fill_then_advance;

/// Credential submission: names, email, password, country, terms.
pub struct AccountHandler;

#[async_trait]
impl FormFill for AccountHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let ctx = env.ctx;
        let stage = env.stage();
        let profile = env.profile();
        let credentials = &env.user.credentials;

        ensure_success!(fill_and_verify(ctx, "account.first_name", &profile.first_name, stage).await?);
        ensure_success!(fill_and_verify(ctx, "account.last_name", &profile.last_name, stage).await?);
        ensure_success!(fill_and_verify(ctx, "account.email", &credentials.email, stage).await?);
        ensure_success!(fill_password(ctx, "account.password", &credentials.password, stage).await?);

        if !profile.country.trim().is_empty() {
            ensure_success!(
                select_dropdown(
                    ctx,
                    "account.country",
                    Some("account.country_search"),
                    &profile.country,
                    stage,
                )
                .await?
            );
        }

        let terms = env.catalog().field("account.terms");
        ensure_checked(ctx, &terms, "terms", stage).await
    }
}

#[async_trait]
impl StepHandler for AccountHandler {
    fn name(&self) -> &str {
        "account"
    }

    #[instrument(skip_all, fields(run = %env.ctx.run_id(), step = "account"))]
    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        fill_then_advance(env, options, self).await
    }
}
