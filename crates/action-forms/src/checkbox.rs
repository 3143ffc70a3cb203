//! Checkboxes and single-choice controls.

use action_primitives::{click, codes, wait_for_any, ActionError, Outcome, RunCtx};
use cdp_adapter::{AnchorDescriptor, ElementRef, ForcedState};
use tracing::{debug, warn};

/// Make sure the checkbox behind `anchors` ends up checked: direct click
/// first, a second click as fallback.
pub async fn ensure_checked(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    label: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let Some(found) = wait_for_any(ctx, anchors, ctx.timing().selector_timeout()).await? else {
        return Ok(not_found(label, stage));
    };
    let control = found.element;
    if is_checked(ctx, &control).await? {
        debug!(field = label, "checkbox already checked");
        return Ok(Outcome::success(stage));
    }

    for click_no in 1..=2 {
        click(ctx, &control).await?;
        if is_checked(ctx, &control).await? {
            return Ok(Outcome::success(stage));
        }
        debug!(field = label, click_no, "checkbox click did not register");
    }

    Ok(Outcome::error(
        codes::field(label, codes::CHECKBOX_FAILED),
        format!("{label} still unchecked after two clicks"),
        stage,
    ))
}

/// Selection-with-verification for ambiguous controls (radio groups, option
/// cards): click, re-click if the first click was dropped, force the checked
/// state by script as a last resort, then re-verify.
pub async fn select_with_verification(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    label: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let Some(found) = wait_for_any(ctx, anchors, ctx.timing().selector_timeout()).await? else {
        return Ok(not_found(label, stage));
    };
    let control = found.element;

    click(ctx, &control).await?;
    if is_checked(ctx, &control).await? {
        return Ok(Outcome::success(stage));
    }

    debug!(field = label, "first click dropped; clicking again");
    click(ctx, &control).await?;
    if is_checked(ctx, &control).await? {
        return Ok(Outcome::success(stage));
    }

    warn!(field = label, "forcing checked state");
    ctx.page()
        .force_state(&control, ForcedState::Checked(true))
        .await?;
    if is_checked(ctx, &control).await? {
        return Ok(Outcome::success(stage));
    }

    Ok(Outcome::error(
        codes::field(label, codes::SELECTION_FAILED),
        format!("{label} did not stay selected, even after forcing its state"),
        stage,
    ))
}

async fn is_checked(ctx: &RunCtx, control: &ElementRef) -> Result<bool, ActionError> {
    Ok(ctx.page().element_state(control).await?.checked)
}

fn not_found(label: &str, stage: &str) -> Outcome {
    Outcome::error(
        codes::field(label, codes::FIELD_NOT_FOUND),
        format!("{label} control not found"),
        stage,
    )
}
