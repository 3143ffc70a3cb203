//! Phone-verification sub-flow shown after the location screen.

use action_primitives::{
    click_first, codes, press_key, type_human, wait_absent, wait_for_any, ActionError, Outcome,
    RunCtx,
};
use formpilot_state_center::UserRecord;
use tracing::{info, instrument, warn};

use crate::detector::error_banner;
use crate::errors::FlowError;
use crate::otp::OtpProvider;

const STAGE: &str = "phone_verification";

/// Verify the user's phone when the wizard asks for it. No dialog means
/// nothing to do.
#[instrument(skip_all, fields(run = %ctx.run_id(), user = %user.user_id))]
pub async fn verify_phone(
    ctx: &RunCtx,
    user: &UserRecord,
    otp: &dyn OtpProvider,
    otp_timeout_secs: u64,
) -> Result<Outcome, FlowError> {
    let catalog = ctx.catalog();
    let dialog = catalog.field("phone.verify_dialog");
    if wait_for_any(ctx, &dialog, ctx.timing().selector_timeout())
        .await?
        .is_none()
    {
        info!("no phone verification requested");
        return Ok(Outcome::success(STAGE));
    }

    let send = catalog.field("phone.send_code");
    if click_first(ctx, &send, ctx.timing().selector_timeout())
        .await?
        .is_none()
    {
        warn!("send-code control not found; waiting for an already sent code");
    }

    let country_code = user.profile.country_code.as_str();
    let Some(code) = otp
        .wait_for_otp(&user.user_id, country_code, otp_timeout_secs)
        .await?
    else {
        return Ok(Outcome::error(
            codes::OTP_NOT_RECEIVED,
            format!("no code within {otp_timeout_secs}s from {}", otp.name()),
            STAGE,
        ));
    };

    let input = catalog.field("phone.code_input");
    let Some(field) = wait_for_any(ctx, &input, ctx.timing().selector_timeout()).await? else {
        return Ok(failed(ctx, "code input not found").await?);
    };
    type_human(ctx, &field.element, &code, ctx.timing().typing_delay).await?;

    let verify = catalog.field("phone.verify");
    if click_first(ctx, &verify, ctx.timing().selector_timeout())
        .await?
        .is_none()
    {
        press_key(ctx, "Enter").await?;
    }

    if wait_absent(ctx, &dialog, ctx.timing().long_timeout()).await? {
        info!("phone verified");
        return Ok(Outcome::success(STAGE));
    }
    Ok(failed(ctx, "verification dialog still open after entering the code").await?)
}

async fn failed(ctx: &RunCtx, reason: &str) -> Result<Outcome, ActionError> {
    let evidence = match error_banner(ctx).await? {
        Some(marker) => format!("{reason}; page says '{marker}'"),
        None => reason.to_string(),
    };
    Ok(Outcome::error(codes::PHONE_VERIFICATION_FAILED, evidence, STAGE))
}
