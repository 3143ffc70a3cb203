use action_forms::upload_file;
use action_primitives::{click_first, current_url, settle, ActionError, Outcome, WaitTier};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use tracing::{info, instrument};

use crate::ensure_success;
use crate::handler::{StepEnv, StepHandler};
use crate::templates::validate_page;

/// Resume import: upload the resume when the user has one, otherwise choose
/// manual entry. Upload-only runs never choose manual entry.
pub struct ResumeImportHandler;

#[async_trait]
impl StepHandler for ResumeImportHandler {
    fn name(&self) -> &str {
        "resume_import"
    }

    #[instrument(skip_all, fields(run = %env.ctx.run_id(), step = "resume_import"))]
    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        if let Some(wrong_page) = validate_page(env).await? {
            return Ok(wrong_page);
        }
        let navigator = env.navigator();

        if let Some(resume) = &env.user.resume_path {
            ensure_success!(
                upload_file(
                    env.ctx,
                    Some("resume_import.upload_trigger"),
                    "resume_import.file_input",
                    resume,
                    "resume",
                    env.stage(),
                )
                .await?
            );
            return navigator.advance(env.step).await;
        }

        if options.upload_only {
            info!("no resume on record; upload-only run just advances");
            return navigator.advance_or_jump(env.step).await;
        }

        let before = current_url(env.ctx).await?;
        let manual = env.catalog().field("resume_import.manual");
        if click_first(env.ctx, &manual, env.ctx.timing().selector_timeout())
            .await?
            .is_some()
        {
            settle(env.ctx, WaitTier::Idle).await?;
            let moved = navigator.verify_moved(env.step, &before).await?;
            if moved.is_success() {
                return Ok(moved);
            }
        }
        navigator.advance_or_jump(env.step).await
    }
}
