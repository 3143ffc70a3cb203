//! Searchable typeahead inputs.

use action_primitives::{
    click, codes, press_key, type_human, wait_for_any, ActionError, Outcome, RunCtx,
};
use cdp_adapter::{AnchorDescriptor, ClearMethod, ElementRef, ForcedState};
use tracing::{debug, instrument, warn};

use crate::{anchors_for_value, field_label, option_anchors};

/// How the input reflects a successful pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeaheadMode {
    /// Multi-select: the pick becomes a chip (catalog `<step>.chip`, with
    /// `{value}` standing for the picked value) and the input is emptied.
    Chip,
    /// Single value: the input keeps the picked value. Forced by script when
    /// neither the suggestion nor Enter sticks.
    Single,
}

/// Type `value` into the typeahead behind catalog `input_key`, pick the
/// matching suggestion (Enter as fallback) and verify the pick.
#[instrument(skip(ctx), fields(run = %ctx.run_id()))]
pub async fn choose_typeahead(
    ctx: &RunCtx,
    input_key: &str,
    value: &str,
    mode: TypeaheadMode,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let label = field_label(input_key);
    if value.trim().is_empty() {
        return Ok(Outcome::error(
            codes::field(label, codes::FILL_FAILED),
            format!("no {label} value to enter"),
            stage,
        ));
    }

    let anchors = ctx.catalog().field(input_key);
    let Some(found) = wait_for_any(ctx, &anchors, ctx.timing().selector_timeout()).await? else {
        return Ok(Outcome::error(
            codes::field(label, codes::FIELD_NOT_FOUND),
            format!("{label} input not found"),
            stage,
        ));
    };
    let input = found.element;
    let suggestions = option_anchors(value);
    let chips = match mode {
        TypeaheadMode::Chip => chip_anchors(ctx, input_key, value),
        TypeaheadMode::Single => Vec::new(),
    };

    let retry = ctx.retry();
    for attempt in 1..=retry.attempts() {
        ctx.page().focus(&input).await?;
        ctx.page().clear(&input, ClearMethod::Keyboard).await?;
        type_human(ctx, &input, value, ctx.timing().typing_delay).await?;

        if let Some(suggestion) =
            wait_for_any(ctx, &suggestions, ctx.timing().selector_timeout()).await?
        {
            click(ctx, &suggestion.element).await?;
            if picked(ctx, &input, value, &chips).await? {
                debug!(field = label, attempt, "suggestion picked");
                return Ok(Outcome::success(stage));
            }
        }

        press_key(ctx, "Enter").await?;
        if picked(ctx, &input, value, &chips).await? {
            debug!(field = label, attempt, "picked with Enter");
            return Ok(Outcome::success(stage));
        }

        if attempt < retry.attempts() {
            ctx.pacer().sleep(retry.backoff(attempt)).await;
        }
    }

    if mode == TypeaheadMode::Single {
        warn!(field = label, "forcing typeahead value");
        ctx.page()
            .force_state(&input, ForcedState::Value(value.to_string()))
            .await?;
        if picked(ctx, &input, value, &chips).await? {
            return Ok(Outcome::success(stage));
        }
    }

    Ok(Outcome::error(
        codes::field(label, codes::SELECTION_FAILED),
        format!("'{value}' was not picked in {label}"),
        stage,
    ))
}

/// Chip anchors for `value`: the catalog's `<step>.chip` entry, then a
/// generic remove button.
fn chip_anchors(ctx: &RunCtx, input_key: &str, value: &str) -> Vec<AnchorDescriptor> {
    let step = input_key
        .rsplit_once('.')
        .map_or(input_key, |(step, _)| step);
    let mut anchors = anchors_for_value(&ctx.catalog().field(&format!("{step}.chip")), value);
    anchors.push(AnchorDescriptor::aria("button", format!("Remove {value}")));
    anchors
}

/// Single picks keep the value in the input. Chip picks empty the input and
/// leave a chip for the value behind (`chips` is non-empty only in chip mode).
async fn picked(
    ctx: &RunCtx,
    input: &ElementRef,
    value: &str,
    chips: &[AnchorDescriptor],
) -> Result<bool, ActionError> {
    let current = ctx.page().element_state(input).await?.value;
    if chips.is_empty() {
        let current = current.trim().to_lowercase();
        return Ok(!current.is_empty() && current.starts_with(&value.trim().to_lowercase()));
    }
    if !current.trim().is_empty() {
        return Ok(false);
    }
    Ok(wait_for_any(ctx, chips, ctx.timing().selector_timeout())
        .await?
        .is_some())
}
