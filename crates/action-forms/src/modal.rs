//! Modal dialogs used for repeatable entries (employment, education, photo).

use action_primitives::{
    click, click_first, codes, find_now, press_key, wait_absent, wait_for_any,
    ActionError, Outcome, RunCtx,
};
use formpilot_core_types::code_token;
use tracing::{debug, instrument, warn};

pub const DIALOG_FIELD: &str = "modal.dialog";
pub const SAVE_FIELD: &str = "modal.save";
pub const CLOSE_FIELD: &str = "modal.close";

/// Which modal to drive: its code name (`EMPLOYMENT`), the catalog key of
/// the control that opens it and, optionally, of a title that proves the
/// right dialog is showing.
#[derive(Debug, Clone, Copy)]
pub struct ModalSpec<'a> {
    pub name: &'a str,
    pub trigger_key: &'a str,
    pub title_key: Option<&'a str>,
}

impl<'a> ModalSpec<'a> {
    pub fn new(name: &'a str, trigger_key: &'a str) -> Self {
        Self {
            name,
            trigger_key,
            title_key: None,
        }
    }

    pub fn titled(mut self, title_key: &'a str) -> Self {
        self.title_key = Some(title_key);
        self
    }

    fn code(&self, suffix: &str) -> String {
        format!("{}_{suffix}", code_token(self.name))
    }
}

/// Click the trigger and wait for the dialog (and its title, when given).
#[instrument(skip(ctx), fields(run = %ctx.run_id(), modal = spec.name))]
pub async fn open_modal(
    ctx: &RunCtx,
    spec: ModalSpec<'_>,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let trigger = ctx.catalog().field(spec.trigger_key);
    let dialog = ctx.catalog().field(DIALOG_FIELD);
    let title = spec
        .title_key
        .map(|key| ctx.catalog().field(key))
        .unwrap_or_default();

    let retry = ctx.retry();
    for attempt in 1..=retry.attempts() {
        match click_first(ctx, &trigger, ctx.timing().selector_timeout()).await? {
            None => debug!(attempt, "modal trigger not found"),
            Some(_) => {
                let opened = wait_for_any(ctx, &dialog, ctx.timing().long_timeout())
                    .await?
                    .is_some();
                let titled = title.is_empty() || find_now(ctx, &title).await?.is_some();
                if opened && titled {
                    debug!(attempt, "modal open");
                    return Ok(Outcome::success(stage));
                }
                debug!(attempt, opened, titled, "modal did not open as expected");
            }
        }
        if attempt < retry.attempts() {
            ctx.pacer().sleep(retry.backoff(attempt)).await;
        }
    }

    Ok(Outcome::error(
        spec.code(codes::MODAL_NOT_OPENED),
        format!("{} modal did not open after {} attempts", spec.name, retry.attempts()),
        stage,
    ))
}

/// Dismiss the open dialog: close button first, Escape as fallback.
/// Succeeds immediately when no dialog is showing.
#[instrument(skip(ctx), fields(run = %ctx.run_id(), modal = spec.name))]
pub async fn close_modal(
    ctx: &RunCtx,
    spec: ModalSpec<'_>,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let dialog = ctx.catalog().field(DIALOG_FIELD);
    if find_now(ctx, &dialog).await?.is_none() {
        return Ok(Outcome::success(stage));
    }

    let close = ctx.catalog().field(CLOSE_FIELD);
    if let Some(found) = find_now(ctx, &close).await? {
        click(ctx, &found.element).await?;
        if wait_absent(ctx, &dialog, ctx.timing().selector_timeout()).await? {
            return Ok(Outcome::success(stage));
        }
    }

    debug!("closing modal with Escape");
    press_key(ctx, "Escape").await?;
    if wait_absent(ctx, &dialog, ctx.timing().selector_timeout()).await? {
        return Ok(Outcome::success(stage));
    }

    Ok(Outcome::error(
        spec.code(codes::MODAL_NOT_CLOSED),
        format!("{} modal is still open", spec.name),
        stage,
    ))
}

/// Click the dialog's save control and wait for it to go away. If the save
/// control is missing or the dialog stays, fall back to [`close_modal`].
#[instrument(skip(ctx), fields(run = %ctx.run_id(), modal = spec.name))]
pub async fn save_modal(
    ctx: &RunCtx,
    spec: ModalSpec<'_>,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let dialog = ctx.catalog().field(DIALOG_FIELD);
    let save = ctx.catalog().field(SAVE_FIELD);

    match click_first(ctx, &save, ctx.timing().selector_timeout()).await? {
        Some(_) => {
            if wait_absent(ctx, &dialog, ctx.timing().long_timeout()).await? {
                return Ok(Outcome::success(stage));
            }
            warn!("modal stayed open after save");
        }
        None => warn!("modal save control not found"),
    }
    close_modal(ctx, spec, stage).await
}
