//! File uploads through (usually hidden) file inputs.

use std::path::Path;

use action_primitives::{
    click_first, codes, wait_for_hidden, ActionError, Outcome, RunCtx,
};
use tracing::{debug, instrument, warn};

/// Attach the local file at `path` to the file input behind catalog
/// `input_key`, clicking the optional `trigger_key` first to reveal it.
///
/// A missing local file and a rejected upload are both `<LABEL>_UPLOAD_FAILED`;
/// the underlying message is kept in the evidence.
#[instrument(skip(ctx, path), fields(run = %ctx.run_id(), file = %path.display()))]
pub async fn upload_file(
    ctx: &RunCtx,
    trigger_key: Option<&str>,
    input_key: &str,
    path: &Path,
    label: &str,
    stage: &str,
) -> Result<Outcome, ActionError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Ok(Outcome::error(
                codes::field(label, codes::UPLOAD_FAILED),
                format!("{} is not a regular file", path.display()),
                stage,
            ))
        }
        Err(err) => {
            return Ok(Outcome::error(
                codes::field(label, codes::UPLOAD_FAILED),
                format!("cannot read {}: {err}", path.display()),
                stage,
            ))
        }
    }

    if let Some(trigger_key) = trigger_key {
        let trigger = ctx.catalog().field(trigger_key);
        if click_first(ctx, &trigger, ctx.timing().selector_timeout())
            .await?
            .is_none()
        {
            debug!(trigger = trigger_key, "upload trigger not visible; looking for the input directly");
        }
    }

    let anchors = ctx.catalog().field(input_key);
    let Some(input) = wait_for_hidden(ctx, &anchors, ctx.timing().long_timeout()).await? else {
        return Ok(Outcome::error(
            codes::field(label, codes::FIELD_NOT_FOUND),
            format!("{label} file input not found"),
            stage,
        ));
    };

    if let Err(err) = ctx.page().upload_file(&input.element, path).await {
        warn!(%err, "upload rejected");
        return Ok(Outcome::error(
            codes::field(label, codes::UPLOAD_FAILED),
            err.to_string(),
            stage,
        ));
    }
    ctx.pacer().pause(ctx.timing().action_delay).await;
    Ok(Outcome::success(stage))
}
