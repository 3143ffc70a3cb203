//! Click primitive

use std::time::Duration;

use cdp_adapter::{AnchorDescriptor, ElementRef};
use tracing::debug;

use super::wait::{wait_for_any, Located};
use crate::{context::RunCtx, errors::ActionError};

/// Click the element, then apply the action delay.
pub async fn click(ctx: &RunCtx, element: &ElementRef) -> Result<(), ActionError> {
    debug!(run = %ctx.run_id(), target = %element.label, "click");
    ctx.page().click(element).await?;
    ctx.pacer().pause(ctx.timing().action_delay).await;
    Ok(())
}

/// Wait for the first alternative that resolves and click it.
pub async fn click_first(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    timeout: Duration,
) -> Result<Option<Located>, ActionError> {
    match wait_for_any(ctx, anchors, timeout).await? {
        Some(found) => {
            click(ctx, &found.element).await?;
            Ok(Some(found))
        }
        None => Ok(None),
    }
}
