//! Searchable dropdowns.

use std::time::Duration;

use action_primitives::{
    click, codes, press_key, type_human, wait_for_any, ActionError, Outcome, RunCtx,
};
use cdp_adapter::ElementRef;
use tracing::{debug, instrument};

use crate::{field_label, option_anchors};

/// Open the dropdown behind catalog `trigger_key` and pick `value`.
///
/// Primary strategy: type-ahead into the search box (`search_key`, when the
/// dropdown has one) and click the matching option. Fallback: ArrowDown +
/// Enter. The pick is verified by reading the trigger back.
#[instrument(skip(ctx), fields(run = %ctx.run_id()))]
pub async fn select_dropdown(
    ctx: &RunCtx,
    trigger_key: &str,
    search_key: Option<&str>,
    value: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let label = field_label(trigger_key);
    if value.trim().is_empty() {
        return Ok(Outcome::error(
            codes::field(label, codes::OPTION_NOT_FOUND),
            format!("no {label} value to select"),
            stage,
        ));
    }

    let anchors = ctx.catalog().field(trigger_key);
    let Some(found) = wait_for_any(ctx, &anchors, ctx.timing().selector_timeout()).await? else {
        return Ok(Outcome::error(
            codes::field(label, codes::FIELD_NOT_FOUND),
            format!("{label} dropdown not found"),
            stage,
        ));
    };
    let trigger = found.element;
    let options = option_anchors(value);
    let short = short_timeout(ctx);

    let retry = ctx.retry();
    for attempt in 1..=retry.attempts() {
        click(ctx, &trigger).await?;

        if let Some(search_key) = search_key {
            let search = ctx.catalog().field(search_key);
            if let Some(input) = wait_for_any(ctx, &search, short).await? {
                type_human(ctx, &input.element, value, ctx.timing().typing_delay).await?;
            }
        }

        if let Some(option) = wait_for_any(ctx, &options, short).await? {
            click(ctx, &option.element).await?;
            if shows(ctx, &trigger, value).await? {
                debug!(field = label, attempt, "option picked");
                return Ok(Outcome::success(stage));
            }
        }

        debug!(field = label, attempt, "falling back to keyboard selection");
        press_key(ctx, "ArrowDown").await?;
        press_key(ctx, "Enter").await?;
        if shows(ctx, &trigger, value).await? {
            return Ok(Outcome::success(stage));
        }

        if attempt < retry.attempts() {
            ctx.pacer().sleep(retry.backoff(attempt)).await;
        }
    }

    Ok(Outcome::error(
        codes::field(label, codes::OPTION_NOT_FOUND),
        format!("option '{value}' could not be selected in {label}"),
        stage,
    ))
}

async fn shows(ctx: &RunCtx, trigger: &ElementRef, value: &str) -> Result<bool, ActionError> {
    let state = ctx.page().element_state(trigger).await?;
    let wanted = value.trim().to_lowercase();
    Ok(state.text.to_lowercase().contains(&wanted) || state.value.to_lowercase().contains(&wanted))
}

/// Options render fast once the list is open; a quarter of the selector
/// timeout is plenty.
fn short_timeout(ctx: &RunCtx) -> Duration {
    ctx.timing().selector_timeout() / 4
}
