//! Best-effort screenshot capture

use tracing::warn;

use crate::context::RunCtx;

/// Capture the viewport under a named checkpoint and record it on the run.
///
/// Never fails: a capture or storage error is logged and the checkpoint is
/// recorded with an empty reference.
pub async fn capture(ctx: &RunCtx, name: &str) -> String {
    let reference = match ctx.page().screenshot().await {
        Ok(png) => match ctx.sink().store(ctx.run_id(), name, &png).await {
            Ok(reference) => reference,
            Err(err) => {
                warn!(run = %ctx.run_id(), checkpoint = name, %err, "screenshot not stored");
                String::new()
            }
        },
        Err(err) => {
            warn!(run = %ctx.run_id(), checkpoint = name, %err, "screenshot capture failed");
            String::new()
        }
    };
    ctx.record_screenshot(name, reference.clone());
    reference
}
