//! Reads the live page: which declared step it shows and which banners it
//! carries.

use action_primitives::{current_url, ActionError, RunCtx};
use formpilot_core_types::DetectedStep;

/// Current URL and the step it shows.
pub async fn detect(ctx: &RunCtx) -> Result<(String, DetectedStep), ActionError> {
    let url = current_url(ctx).await?;
    let detected = ctx.catalog().plan().detect(&url);
    Ok((url, detected))
}

/// Captcha / bot-check banner on the page, if any.
pub async fn captcha_banner(ctx: &RunCtx) -> Result<Option<String>, ActionError> {
    let text = ctx.page().page_text().await?;
    Ok(ctx.catalog().captcha_marker_in(&text).map(str::to_string))
}

/// Validation-error banner on the page, if any.
pub async fn error_banner(ctx: &RunCtx) -> Result<Option<String>, ActionError> {
    let text = ctx.page().page_text().await?;
    Ok(ctx.catalog().error_marker_in(&text).map(str::to_string))
}
