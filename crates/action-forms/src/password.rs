//! Hardened password entry. The secret itself never reaches logs or outcomes;
//! only its length does.

use action_primitives::{
    codes, find_now, press_key, type_human, wait_for_any, ActionError, Located, Outcome, RunCtx,
};
use cdp_adapter::{AnchorDescriptor, ClearMethod, ElementRef};
use tracing::{debug, instrument, warn};

const LABEL: &str = "password";

/// Enter `password` into the field behind catalog `key`.
///
/// Stricter than [`fill_and_verify`](crate::fill_and_verify): long timeout,
/// a type/id/name cross-check so a revealed username field is never typed
/// into, slow per-character typing, script clearing when keyboard clearing
/// leaves residue, and exact read-back.
#[instrument(skip_all, fields(run = %ctx.run_id(), key = %key, password_len = password.chars().count()))]
pub async fn fill_password(
    ctx: &RunCtx,
    key: &str,
    password: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let expected_len = password.chars().count();
    if password.is_empty() {
        return Ok(Outcome::error(
            codes::field(LABEL, codes::FILL_FAILED),
            "no password on record",
            stage,
        ));
    }

    let anchors = ctx.catalog().field(key);
    let Some(first) = wait_for_any(ctx, &anchors, ctx.timing().long_timeout()).await? else {
        return Ok(Outcome::error(
            codes::field(LABEL, codes::FIELD_NOT_FOUND),
            "password field not found",
            stage,
        ));
    };
    let Some(field) = password_like(ctx, &anchors, first).await? else {
        return Ok(Outcome::error(
            codes::field(LABEL, codes::FIELD_NOT_FOUND),
            "matched elements are not password inputs",
            stage,
        ));
    };

    let retry = ctx.retry();
    let mut last_len = 0;
    for attempt in 1..=retry.attempts() {
        ctx.page().focus(&field).await?;
        if !clear_fully(ctx, &field).await? {
            warn!(attempt, "password field kept residue after script clear");
            ctx.pacer().sleep(retry.backoff(attempt)).await;
            continue;
        }

        type_human(ctx, &field, password, ctx.timing().password_typing_delay).await?;
        press_key(ctx, "Tab").await?;

        let read = ctx.page().element_state(&field).await?.value;
        last_len = read.chars().count();
        if read == password {
            debug!(attempt, "password verified");
            return Ok(Outcome::success(stage));
        }
        debug!(attempt, expected_len, read_len = last_len, "password mismatch");
        if attempt < retry.attempts() {
            ctx.pacer().sleep(retry.backoff(attempt)).await;
        }
    }

    Ok(Outcome::error(
        codes::field(LABEL, codes::FILL_FAILED),
        format!(
            "password not verified after {} attempts (expected {expected_len} characters, field holds {last_len})",
            retry.attempts()
        ),
        stage,
    ))
}

/// Prefer the first match when it looks like a password input; otherwise
/// look through the remaining alternatives for one that does.
async fn password_like(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    first: Located,
) -> Result<Option<ElementRef>, ActionError> {
    if ctx.page().element_state(&first.element).await?.is_password_like() {
        return Ok(Some(first.element));
    }
    warn!(anchor = %first.anchor, "first password match is not a password input");
    for anchor in anchors.iter().skip(first.index + 1) {
        if let Some(found) = find_now(ctx, std::slice::from_ref(anchor)).await? {
            if ctx.page().element_state(&found.element).await?.is_password_like() {
                return Ok(Some(found.element));
            }
        }
    }
    Ok(None)
}

async fn clear_fully(ctx: &RunCtx, field: &ElementRef) -> Result<bool, ActionError> {
    ctx.page().clear(field, ClearMethod::Keyboard).await?;
    if ctx.page().element_state(field).await?.value.is_empty() {
        return Ok(true);
    }
    debug!("keyboard clear left residue; clearing by script");
    ctx.page().clear(field, ClearMethod::Script).await?;
    Ok(ctx.page().element_state(field).await?.value.is_empty())
}
