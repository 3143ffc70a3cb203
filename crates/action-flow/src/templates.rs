//! Reusable execution templates shared by the step handlers.

use action_primitives::{click, codes, current_url, find_now, ActionError, Outcome};
use formpilot_core_types::RunOptions;
use tracing::{debug, info};

use crate::ensure_success;
use crate::handler::{FormFill, StepEnv};

/// `Some(<STEP>_PAGE_NOT_FOUND)` unless the live URL shows the handler's step.
pub async fn validate_page(env: &StepEnv<'_>) -> Result<Option<Outcome>, ActionError> {
    let url = current_url(env.ctx).await?;
    if env.step.matches(&url) {
        return Ok(None);
    }
    Ok(Some(env.fail(
        codes::PAGE_NOT_FOUND,
        format!("expected {} but the page is {url}", env.step.fragment),
    )))
}

/// Validate the page, then advance (direct navigation if no control exists).
pub async fn simple_advance(env: &StepEnv<'_>) -> Result<Outcome, ActionError> {
    if let Some(wrong_page) = validate_page(env).await? {
        return Ok(wrong_page);
    }
    env.navigator().advance_or_jump(env.step).await
}

/// Validate the page, fill, advance. Upload-only runs skip the fill.
pub async fn fill_then_advance(
    env: &StepEnv<'_>,
    options: &RunOptions,
    form: &dyn FormFill,
) -> Result<Outcome, ActionError> {
    if let Some(wrong_page) = validate_page(env).await? {
        return Ok(wrong_page);
    }
    if options.upload_only {
        debug!(step = %env.step.name, "upload-only run; not entering data");
    } else {
        ensure_success!(form.fill(env).await?);
    }
    env.navigator().advance(env.step).await
}

/// Advance first: data from an earlier run may already be in place. If that
/// fails, edit the existing entry when an edit control (`<step>.edit`) is
/// showing, else fill from scratch, then advance again.
///
/// Upload-only runs report the failed advance instead of re-entering data.
pub async fn try_advance_before_fill(
    env: &StepEnv<'_>,
    options: &RunOptions,
    form: &dyn FormFill,
) -> Result<Outcome, ActionError> {
    if let Some(wrong_page) = validate_page(env).await? {
        return Ok(wrong_page);
    }

    let navigator = env.navigator();
    let first = navigator.advance(env.step).await?;
    if first.is_success() || options.upload_only {
        return Ok(first);
    }
    info!(
        step = %env.step.name,
        code = first.error_code().unwrap_or_default(),
        "advance before fill failed; entering data"
    );

    let edit = env.catalog().field(&env.key("edit"));
    if let Some(control) = find_now(env.ctx, &edit).await? {
        debug!(step = %env.step.name, "editing the existing entry");
        click(env.ctx, &control.element).await?;
    }
    ensure_success!(form.fill(env).await?);
    navigator.advance(env.step).await
}
