use action_primitives::{
    click_first, codes, current_url, wait_for_any, wait_for_url_change, ActionError, Outcome,
};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use tracing::{info, instrument};

use crate::handler::{StepEnv, StepHandler};
use crate::templates::validate_page;

/// Final review screen: click submit and wait for the confirmation.
pub struct SubmitHandler;

#[async_trait]
impl StepHandler for SubmitHandler {
    fn name(&self) -> &str {
        "submit"
    }

    #[instrument(skip_all, fields(run = %env.ctx.run_id(), step = "submit"))]
    async fn execute(&self, env: &StepEnv<'_>, _options: &RunOptions) -> Result<Outcome, ActionError> {
        if let Some(wrong_page) = validate_page(env).await? {
            return Ok(wrong_page);
        }
        let ctx = env.ctx;
        let before = current_url(ctx).await?;

        let button = env.catalog().field("submit.button");
        if click_first(ctx, &button, ctx.timing().selector_timeout())
            .await?
            .is_none()
        {
            return Ok(env.fail(codes::ADVANCE_NOT_FOUND, format!("no submit control on {before}")));
        }

        let done = env.catalog().field("submit.done");
        if wait_for_any(ctx, &done, ctx.timing().long_timeout())
            .await?
            .is_some()
        {
            info!("profile submitted");
            return Ok(Outcome::success(env.stage()));
        }
        if let Some(now) = wait_for_url_change(ctx, &before, ctx.timing().poll_interval()).await? {
            info!(%now, "profile submitted; confirmation text not shown");
            return Ok(Outcome::success(env.stage()));
        }
        Ok(env.fail(
            codes::NAVIGATION_FAILED,
            format!("no confirmation after submitting on {before}"),
        ))
    }
}
