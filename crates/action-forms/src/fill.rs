//! Fill-and-verify protocol for ordinary text fields.

use action_primitives::{
    codes, press_key, type_human, wait_for_any, ActionError, Outcome, RunCtx,
};
use cdp_adapter::ClearMethod;
use tracing::{debug, instrument, warn};

use crate::field_label;

/// Locate the field behind catalog `key`, clear it, type `value`, blur and
/// read the value back.
///
/// An attempt is accepted when the field is non-empty and starts with the
/// same character as `value`. After the retry budget a final leniency check
/// accepts any non-empty value. An empty `value` is never a successful fill.
#[instrument(skip(ctx, value), fields(run = %ctx.run_id(), value_len = value.chars().count()))]
pub async fn fill_and_verify(
    ctx: &RunCtx,
    key: &str,
    value: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    let label = field_label(key);
    if value.trim().is_empty() {
        return Ok(Outcome::error(
            codes::field(label, codes::FILL_FAILED),
            format!("no value to enter into {label}"),
            stage,
        ));
    }

    let anchors = ctx.catalog().field(key);
    let Some(found) = wait_for_any(ctx, &anchors, ctx.timing().selector_timeout()).await? else {
        return Ok(Outcome::error(
            codes::field(label, codes::FIELD_NOT_FOUND),
            format!("{label} field not found ({} alternatives tried)", anchors.len()),
            stage,
        ));
    };
    let field = found.element;

    let retry = ctx.retry();
    for attempt in 1..=retry.attempts() {
        ctx.page().focus(&field).await?;
        ctx.page().clear(&field, ClearMethod::Keyboard).await?;
        type_human(ctx, &field, value, ctx.timing().typing_delay).await?;
        press_key(ctx, "Tab").await?;

        let read = ctx.page().element_state(&field).await?.value;
        if accepted(value, &read) {
            debug!(field = label, attempt, "fill verified");
            return Ok(Outcome::success(stage));
        }
        debug!(
            field = label,
            attempt,
            read_len = read.chars().count(),
            "fill did not verify"
        );
        if attempt < retry.attempts() {
            ctx.pacer().sleep(retry.backoff(attempt)).await;
        }
    }

    let read = ctx.page().element_state(&field).await?.value;
    if !read.trim().is_empty() {
        warn!(field = label, "accepting unverified non-empty value");
        return Ok(Outcome::success(stage));
    }

    Ok(Outcome::error(
        codes::field(label, codes::FILL_FAILED),
        format!("{label} stayed empty after {} attempts", retry.attempts()),
        stage,
    ))
}

/// Fill only when there is something to enter; an empty value is a no-op
/// success. Used for optional profile data.
pub async fn fill_optional(
    ctx: &RunCtx,
    key: &str,
    value: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    if value.trim().is_empty() {
        return Ok(Outcome::success(stage));
    }
    fill_and_verify(ctx, key, value, stage).await
}

fn accepted(expected: &str, read: &str) -> bool {
    let read = read.trim();
    if read.is_empty() {
        return false;
    }
    let first = |s: &str| s.trim().chars().next().map(|c| c.to_lowercase().to_string());
    first(expected) == first(read)
}

#[cfg(test)]
mod tests {
    use super::accepted;

    #[test]
    fn acceptance_requires_content_and_first_char() {
        assert!(accepted("Berlin", "Berlin"));
        assert!(accepted("berlin", "Berlin, DE"));
        assert!(!accepted("Berlin", ""));
        assert!(!accepted("Berlin", "   "));
        assert!(!accepted("Berlin", "Munich"));
    }
}
