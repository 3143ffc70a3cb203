//! Navigation primitives

use tracing::{debug, warn};

use crate::{context::RunCtx, errors::ActionError, types::WaitTier};

/// Navigate and wait for the page to go idle.
pub async fn goto(ctx: &RunCtx, url: &str) -> Result<(), ActionError> {
    debug!(run = %ctx.run_id(), url, "goto");
    ctx.page()
        .navigate(url, ctx.timing().navigation_timeout())
        .await?;
    settle(ctx, WaitTier::Idle).await
}

/// Apply a built-in waiting tier. An idle wait that times out is logged and
/// tolerated; pages with long-polling never go fully quiet.
pub async fn settle(ctx: &RunCtx, tier: WaitTier) -> Result<(), ActionError> {
    match tier {
        WaitTier::None => Ok(()),
        WaitTier::DomReady => {
            ctx.pacer().sleep(ctx.timing().poll_interval()).await;
            Ok(())
        }
        WaitTier::Idle => {
            let timing = ctx.timing();
            match ctx
                .page()
                .wait_network_idle(timing.network_quiet(), timing.navigation_timeout())
                .await
            {
                Ok(()) => Ok(()),
                Err(err) if err.retriable => {
                    warn!(run = %ctx.run_id(), %err, "network never went idle");
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

pub async fn current_url(ctx: &RunCtx) -> Result<String, ActionError> {
    Ok(ctx.page().current_url().await?)
}
