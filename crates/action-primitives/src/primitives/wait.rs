//! Selector-retry waits

use std::time::Duration;

use cdp_adapter::{AnchorDescriptor, ElementRef};
use tracing::{debug, trace};

use crate::{context::RunCtx, errors::ActionError};

/// Element found by a selector-retry wait, with the alternative that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub element: ElementRef,
    pub anchor: AnchorDescriptor,
    /// Position of the matching alternative in the list that was tried.
    pub index: usize,
}

#[derive(Clone, Copy)]
enum Visibility {
    Visible,
    Any,
}

/// Poll an ordered list of alternatives until one resolves to a visible
/// element or `timeout` elapses.
///
/// Polls are counted against the timeout at the configured cadence, with the
/// cadence slept through the run's pacer. Returns `Ok(None)` when nothing
/// matched; `Err` only on a transport failure.
pub async fn wait_for_any(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    timeout: Duration,
) -> Result<Option<Located>, ActionError> {
    poll_anchors(ctx, anchors, timeout, Visibility::Visible).await
}

/// Same as [`wait_for_any`] but also accepts hidden elements (file inputs).
pub async fn wait_for_hidden(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    timeout: Duration,
) -> Result<Option<Located>, ActionError> {
    poll_anchors(ctx, anchors, timeout, Visibility::Any).await
}

/// Single pass over the alternatives, no waiting.
pub async fn find_now(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
) -> Result<Option<Located>, ActionError> {
    scan(ctx, anchors, Visibility::Visible).await
}

/// Wait until none of the alternatives resolves. Returns whether that happened
/// before the timeout.
pub async fn wait_absent(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    timeout: Duration,
) -> Result<bool, ActionError> {
    let polls = poll_count(ctx, timeout);
    for poll in 0..polls {
        if scan(ctx, anchors, Visibility::Visible).await?.is_none() {
            return Ok(true);
        }
        if poll + 1 < polls {
            ctx.pacer().sleep(ctx.timing().poll_interval()).await;
        }
    }
    Ok(false)
}

/// Wait for the page URL to move away from `from`. Returns the new URL, or
/// `None` if it never changed.
pub async fn wait_for_url_change(
    ctx: &RunCtx,
    from: &str,
    timeout: Duration,
) -> Result<Option<String>, ActionError> {
    let polls = poll_count(ctx, timeout);
    for poll in 0..polls {
        let url = ctx.page().current_url().await?;
        if url != from {
            return Ok(Some(url));
        }
        if poll + 1 < polls {
            ctx.pacer().sleep(ctx.timing().poll_interval()).await;
        }
    }
    Ok(None)
}

async fn poll_anchors(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    timeout: Duration,
    visibility: Visibility,
) -> Result<Option<Located>, ActionError> {
    if anchors.is_empty() {
        debug!(run = %ctx.run_id(), "selector wait called with no alternatives");
        return Ok(None);
    }

    let polls = poll_count(ctx, timeout);
    for poll in 0..polls {
        if let Some(found) = scan(ctx, anchors, visibility).await? {
            trace!(run = %ctx.run_id(), anchor = %found.anchor, poll, "anchor resolved");
            return Ok(Some(found));
        }
        if poll + 1 < polls {
            ctx.pacer().sleep(ctx.timing().poll_interval()).await;
        }
    }

    debug!(
        run = %ctx.run_id(),
        alternatives = anchors.len(),
        timeout_ms = timeout.as_millis() as u64,
        "no alternative resolved"
    );
    Ok(None)
}

async fn scan(
    ctx: &RunCtx,
    anchors: &[AnchorDescriptor],
    visibility: Visibility,
) -> Result<Option<Located>, ActionError> {
    for (index, anchor) in anchors.iter().enumerate() {
        let found = match visibility {
            Visibility::Visible => ctx.page().query(anchor).await?,
            Visibility::Any => ctx.page().query_any(anchor).await?,
        };
        if let Some(element) = found {
            return Ok(Some(Located {
                element,
                anchor: anchor.clone(),
                index,
            }));
        }
    }
    Ok(None)
}

fn poll_count(ctx: &RunCtx, timeout: Duration) -> u64 {
    let interval = ctx.timing().poll_interval().as_millis().max(1);
    let polls = timeout.as_millis().div_ceil(interval);
    (polls as u64).max(1)
}
