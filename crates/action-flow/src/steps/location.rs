use action_forms::{choose_typeahead, fill_optional, save_modal, upload_file, ModalSpec, TypeaheadMode};
use action_primitives::{codes, ActionError, Outcome};
use async_trait::async_trait;
use formpilot_core_types::RunOptions;
use tracing::{debug, instrument};

use crate::ensure_success;
use crate::handler::{StepEnv, StepHandler};
use crate::templates::validate_page;

const PHOTO: ModalSpec<'static> = ModalSpec {
    name: "photo",
    trigger_key: "location.photo_trigger",
    title_key: None,
};

/// Location screen: address, phone, birth date and photo, then the advance
/// click. Where the click leads (phone verification or the submit screen)
/// is the sequencer's terminal handling, so the URL is not verified here.
pub struct LocationHandler;

impl LocationHandler {
    async fn fill(&self, env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
        let ctx = env.ctx;
        let stage = env.stage();
        let profile = env.profile();
        let address = &profile.address;

        ensure_success!(fill_optional(ctx, "location.street", &address.street, stage).await?);
        if !address.city.trim().is_empty() {
            ensure_success!(
                choose_typeahead(ctx, "location.city", &address.city, TypeaheadMode::Single, stage)
                    .await?
            );
        }
        ensure_success!(fill_optional(ctx, "location.state", &address.state, stage).await?);
        ensure_success!(
            fill_optional(ctx, "location.postal_code", &address.postal_code, stage).await?
        );
        ensure_success!(fill_optional(ctx, "location.phone", &profile.phone, stage).await?);
        ensure_success!(fill_optional(ctx, "location.birth_date", &profile.birth_date, stage).await?);

        if let Some(photo) = &profile.photo_path {
            ensure_success!(
                upload_file(
                    ctx,
                    Some(PHOTO.trigger_key),
                    "location.photo_input",
                    photo,
                    "photo",
                    stage,
                )
                .await?
            );
            ensure_success!(save_modal(ctx, PHOTO, stage).await?);
        }
        Ok(Outcome::success(stage))
    }
}

#[async_trait]
impl StepHandler for LocationHandler {
    fn name(&self) -> &str {
        "location"
    }

    #[instrument(skip_all, fields(run = %env.ctx.run_id(), step = "location"))]
    async fn execute(&self, env: &StepEnv<'_>, options: &RunOptions) -> Result<Outcome, ActionError> {
        if let Some(wrong_page) = validate_page(env).await? {
            return Ok(wrong_page);
        }
        if options.upload_only {
            debug!("upload-only run; not entering location data");
        } else {
            ensure_success!(self.fill(env).await?);
        }

        match env.navigator().press_advance(env.step).await? {
            Some(_) => Ok(Outcome::success(env.stage())),
            None => Ok(env.fail(codes::ADVANCE_NOT_FOUND, "no advance control on the location screen")),
        }
    }
}
