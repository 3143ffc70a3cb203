//! Typing primitives

use cdp_adapter::ElementRef;
use tracing::debug;

use crate::{context::RunCtx, errors::ActionError, types::DelayRange};

/// Type `text` one character at a time with a randomized inter-key delay,
/// then apply the action delay. Only the length is logged.
pub async fn type_human(
    ctx: &RunCtx,
    element: &ElementRef,
    text: &str,
    per_char: DelayRange,
) -> Result<(), ActionError> {
    debug!(
        run = %ctx.run_id(),
        target = %element.label,
        text_length = text.chars().count(),
        "typing"
    );

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        ctx.page().type_text(element, ch.encode_utf8(&mut buf)).await?;
        ctx.pacer().pause(per_char).await;
    }
    ctx.pacer().pause(ctx.timing().action_delay).await;
    Ok(())
}

/// Dispatch a named key, then apply the action delay.
pub async fn press_key(ctx: &RunCtx, key: &str) -> Result<(), ActionError> {
    ctx.page().press_key(key).await?;
    ctx.pacer().pause(ctx.timing().action_delay).await;
    Ok(())
}
