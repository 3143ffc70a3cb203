//! Navigation layer: click-to-advance with URL verification, and direct
//! navigation as the escape hatch when no advance control can be found.

use action_primitives::{
    click_first, codes, current_url, goto, settle, wait_for_url_change, ActionError, Located,
    Outcome, RunCtx, WaitTier,
};
use formpilot_core_types::{DetectedStep, StepDescriptor};
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy)]
pub struct Navigator<'a> {
    ctx: &'a RunCtx,
}

impl<'a> Navigator<'a> {
    pub fn new(ctx: &'a RunCtx) -> Self {
        Self { ctx }
    }

    /// Click the step's advance control and require the URL to move to a
    /// different page inside the wizard.
    #[instrument(skip_all, fields(run = %self.ctx.run_id(), step = %step.name))]
    pub async fn advance(&self, step: &StepDescriptor) -> Result<Outcome, ActionError> {
        let before = current_url(self.ctx).await?;
        if self.press_advance(step).await?.is_none() {
            return Ok(Outcome::error(
                codes::step(&step.name, codes::ADVANCE_NOT_FOUND),
                format!("no advance control on {before}"),
                step.name.as_str(),
            ));
        }
        self.verify_moved(step, &before).await
    }

    /// Click the advance control without verifying where it leads. Returns
    /// the control that was clicked.
    pub async fn press_advance(&self, step: &StepDescriptor) -> Result<Option<Located>, ActionError> {
        let anchors = self.ctx.catalog().advance_anchors(&step.name);
        let clicked = click_first(self.ctx, &anchors, self.ctx.timing().selector_timeout()).await?;
        if let Some(found) = &clicked {
            debug!(anchor = %found.anchor, "advance clicked");
            settle(self.ctx, WaitTier::Idle).await?;
        }
        Ok(clicked)
    }

    /// Wait for the URL to leave `before` and stay inside the wizard namespace.
    pub async fn verify_moved(
        &self,
        step: &StepDescriptor,
        before: &str,
    ) -> Result<Outcome, ActionError> {
        let plan = self.ctx.catalog().plan();
        match wait_for_url_change(self.ctx, before, self.ctx.timing().navigation_timeout()).await? {
            Some(now) if plan.in_namespace(&now) => {
                info!(from = before, to = %now, "advanced");
                Ok(Outcome::success(step.name.as_str()))
            }
            Some(now) => Ok(Outcome::error(
                codes::step(&step.name, codes::NAVIGATION_FAILED),
                format!("left the wizard: {now}"),
                step.name.as_str(),
            )),
            None => Ok(Outcome::error(
                codes::step(&step.name, codes::NAVIGATION_FAILED),
                format!("url stayed at {before}"),
                step.name.as_str(),
            )),
        }
    }

    /// Go straight to the URL of the step declared after `step`.
    #[instrument(skip_all, fields(run = %self.ctx.run_id(), step = %step.name))]
    pub async fn direct_navigate(&self, step: &StepDescriptor) -> Result<Outcome, ActionError> {
        let plan = self.ctx.catalog().plan();
        let fail = |evidence: String| {
            Outcome::error(
                codes::step(&step.name, codes::DIRECT_NAVIGATION_FAILED),
                evidence,
                step.name.as_str(),
            )
        };

        let Some(target) = plan.next_url_after(step.position) else {
            return Ok(fail(format!("no step declared after {}", step.name)));
        };
        warn!(%target, "navigating directly");
        if let Err(err) = goto(self.ctx, &target).await {
            return Ok(fail(format!("navigation to {target} failed: {err}")));
        }

        let now = current_url(self.ctx).await?;
        if plan.detect(&now) == DetectedStep::Known(step.position) {
            return Ok(fail(format!("still on {now} after navigating to {target}")));
        }
        Ok(Outcome::success(step.name.as_str()))
    }

    /// [`advance`](Self::advance), falling back to
    /// [`direct_navigate`](Self::direct_navigate) only when no advance
    /// control exists.
    pub async fn advance_or_jump(&self, step: &StepDescriptor) -> Result<Outcome, ActionError> {
        let outcome = self.advance(step).await?;
        let not_found = codes::step(&step.name, codes::ADVANCE_NOT_FOUND);
        if outcome.error_code() == Some(not_found.as_str()) {
            return self.direct_navigate(step).await;
        }
        Ok(outcome)
    }
}
