//! Step sequencer: the state machine that walks the declared plan, trusting
//! the live page over the declared order.

use std::sync::Arc;

use action_primitives::{
    capture, codes, current_url, goto, wait_for_url_change, Outcome, RunCtx,
};
use async_trait::async_trait;
use chrono::Utc;
use formpilot_core_types::{DetectedStep, RunOptions, StepDescriptor, TerminalKind};
use formpilot_state_center::{Milestone, ProxyPool, UserRecord, UserStore};
use tracing::{debug, error, info, instrument, warn};

use crate::detector::{captcha_banner, detect, error_banner};
use crate::errors::FlowError;
use crate::handler::StepEnv;
use crate::otp::{NoOtpProvider, OtpProvider};
use crate::phone::verify_phone;
use crate::registry::HandlerRegistry;
use crate::strategies::{calculate_backoff, FailureStrategy};

const SETUP_STAGE: &str = "setup";
const DONE_STAGE: &str = "done";

/// Run entrypoint: one call drives one wizard run to a single [`Outcome`].
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    /// Never fails: internal errors come back as `hard_fail` outcomes.
    async fn execute(&self, options: &RunOptions) -> Outcome;
}

/// Default executor over a [`HandlerRegistry`].
pub struct StepSequencer {
    ctx: RunCtx,
    store: Arc<dyn UserStore>,
    registry: HandlerRegistry,
    otp: Arc<dyn OtpProvider>,
    proxies: ProxyPool,
    otp_timeout_secs: u64,
}

impl StepSequencer {
    pub fn new(ctx: RunCtx, store: Arc<dyn UserStore>, registry: HandlerRegistry) -> Self {
        Self {
            ctx,
            store,
            registry,
            otp: Arc::new(NoOtpProvider),
            proxies: ProxyPool::default(),
            otp_timeout_secs: 120,
        }
    }

    pub fn with_otp(mut self, otp: Arc<dyn OtpProvider>) -> Self {
        self.otp = otp;
        self
    }

    pub fn with_proxy_pool(mut self, proxies: ProxyPool) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_otp_timeout(mut self, secs: u64) -> Self {
        self.otp_timeout_secs = secs;
        self
    }

    pub fn ctx(&self) -> &RunCtx {
        &self.ctx
    }

    /// The state machine proper. `Err` only for transport and store errors.
    #[instrument(skip_all, fields(run = %self.ctx.run_id(), user = %self.ctx.user_id()))]
    pub async fn run(&self, options: &RunOptions) -> Result<Outcome, FlowError> {
        let user_id = self.ctx.user_id();
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(Outcome::error(
                codes::USER_NOT_FOUND,
                format!("no record for user {user_id}"),
                SETUP_STAGE,
            ));
        };
        self.restore_session(&user).await;

        let plan = self.ctx.catalog().plan();
        let mut index = match &options.force_step {
            Some(step) => {
                let Some(position) = plan.position_of(step) else {
                    return Ok(Outcome::error(
                        codes::UNKNOWN_STEP,
                        format!("step '{step}' is not part of the plan"),
                        SETUP_STAGE,
                    ));
                };
                info!(step = %step, "forcing start step");
                self.open_step(position).await?;
                position
            }
            None => self.locate_start().await?,
        };

        let guard = plan.len() * (self.ctx.retry().attempts() as usize + 1);
        for _ in 0..guard {
            let (url, detected) = detect(&self.ctx).await?;
            let mut realigned = false;
            if let DetectedStep::Known(at) = detected {
                if at != index {
                    info!(planned = index, detected = at, %url, "page shows another step; realigning");
                    index = at;
                    realigned = true;
                }
            }
            let Some(step) = plan.get(index) else {
                break;
            };

            match step.terminal {
                Some(TerminalKind::Location) if options.defer_location => {
                    return Ok(self.defer_location(&user, step).await);
                }
                Some(TerminalKind::Location) => return self.finish_location(&user, step, options).await,
                Some(TerminalKind::Submit) => return self.finish_submit(&user, step, options).await,
                None => {}
            }

            let outcome = self.execute_step(&user, step, options, realigned).await?;
            if step.credentials {
                if let Some(marker) = captcha_banner(&self.ctx).await? {
                    return self.flag_captcha(&user, step, &marker).await;
                }
            }
            if !outcome.is_success() {
                return Ok(outcome);
            }
            if step.sensitive {
                self.save_session(&user).await;
            }

            let (now, after) = detect(&self.ctx).await?;
            match after {
                DetectedStep::Known(next) if next > index => {
                    if next > index + 1 {
                        info!(from = %step.name, to = next, "site skipped ahead");
                    }
                    index = next;
                }
                DetectedStep::Known(same) if same == index => {
                    return self.stuck(step, &now).await;
                }
                _ if now == url => return self.stuck(step, &now).await,
                DetectedStep::Known(earlier) => {
                    warn!(from = %step.name, to = earlier, "site went back");
                    index = earlier;
                }
                DetectedStep::Initial | DetectedStep::Unknown => index += 1,
            }
        }

        let url = current_url(&self.ctx).await?;
        Ok(Outcome::error(
            codes::LOCATION_STEP_NOT_COMPLETED,
            format!("ran out of steps at {url} without reaching a terminal screen"),
            "sequencer",
        ))
    }

    /// Run one step's handler. Realigned steps get the retry budget while
    /// the page keeps showing them; handler errors become hard failures.
    #[instrument(skip_all, fields(step = %step.name, realigned = realigned))]
    async fn execute_step(
        &self,
        user: &UserRecord,
        step: &StepDescriptor,
        options: &RunOptions,
        realigned: bool,
    ) -> Result<Outcome, FlowError> {
        let Some(handler) = self.registry.get(step.name.as_str()) else {
            return Ok(Outcome::error(
                codes::HANDLER_NOT_REGISTERED,
                format!("no handler registered for '{}'", step.name),
                step.name.as_str(),
            ));
        };

        let env = StepEnv::new(&self.ctx, user, step);
        let policy = self.ctx.retry();
        let strategy = FailureStrategy::for_step(realigned, &policy);
        let mut attempt = 1;
        loop {
            let outcome = match handler.execute(&env, options).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(%err, "step handler raised");
                    return Ok(Outcome::error(
                        codes::step(&step.name, codes::UNEXPECTED_ERROR_SUFFIX),
                        err.to_string(),
                        step.name.as_str(),
                    )
                    .hard());
                }
            };
            if outcome.is_success() || !strategy.should_retry(&outcome, attempt) {
                return Ok(outcome);
            }

            let (_, detected) = detect(&self.ctx).await?;
            if detected != DetectedStep::Known(step.position) {
                return Ok(outcome);
            }
            let delay = calculate_backoff(&policy, attempt);
            warn!(
                attempt,
                code = outcome.error_code().unwrap_or_default(),
                delay_ms = delay.as_millis() as u64,
                "retrying step"
            );
            self.ctx.pacer().sleep(delay).await;
            attempt += 1;
        }
    }

    /// Location screen: handler, settle, phone verification, then hand over
    /// to submission.
    async fn finish_location(
        &self,
        user: &UserRecord,
        step: &StepDescriptor,
        options: &RunOptions,
    ) -> Result<Outcome, FlowError> {
        let outcome = self.execute_step(user, step, options, false).await?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        self.ctx.pacer().sleep(self.ctx.timing().settle()).await;
        capture(&self.ctx, step.name.as_str()).await;
        self.save_session(user).await;

        if options.skip_otp {
            info!("skipping phone verification");
        } else {
            let verified =
                verify_phone(&self.ctx, user, self.otp.as_ref(), self.otp_timeout_secs).await?;
            if !verified.is_success() {
                return Ok(verified);
            }
        }

        let plan = self.ctx.catalog().plan();
        let Some(submit) = plan.terminal(TerminalKind::Submit) else {
            capture(&self.ctx, DONE_STAGE).await;
            return Ok(Outcome::success(DONE_STAGE));
        };

        let (url, mut detected) = detect(&self.ctx).await?;
        if detected == DetectedStep::Known(step.position) {
            let timeout = self.ctx.timing().navigation_timeout();
            if let Some(now) = wait_for_url_change(&self.ctx, &url, timeout).await? {
                detected = plan.detect(&now);
            }
        }
        if detected == DetectedStep::Known(submit.position) {
            return self.finish_submit(user, submit, options).await;
        }

        if options.skip_otp {
            if let Some(target) = plan.url_for(submit.position) {
                debug!(%target, "going straight to submission");
                goto(&self.ctx, &target).await?;
                let (_, now) = detect(&self.ctx).await?;
                if now == DetectedStep::Known(submit.position) {
                    return self.finish_submit(user, submit, options).await;
                }
            }
        }

        let url = current_url(&self.ctx).await?;
        Ok(Outcome::error(
            codes::LOCATION_STEP_NOT_COMPLETED,
            format!("location finished but the page is {url}"),
            step.name.as_str(),
        ))
    }

    async fn finish_submit(
        &self,
        user: &UserRecord,
        step: &StepDescriptor,
        options: &RunOptions,
    ) -> Result<Outcome, FlowError> {
        let outcome = self.execute_step(user, step, options, false).await?;
        if !outcome.is_success() {
            return Ok(outcome);
        }
        self.record_milestone(user, Milestone::OnboardingCompleted).await;
        capture(&self.ctx, DONE_STAGE).await;
        info!("onboarding submitted");
        Ok(Outcome::success(DONE_STAGE))
    }

    /// Start where the page already is; open the first step when the page
    /// shows nothing the plan knows.
    async fn locate_start(&self) -> Result<usize, FlowError> {
        let (url, detected) = detect(&self.ctx).await?;
        if let DetectedStep::Known(index) = detected {
            debug!(%url, index, "resuming at detected step");
            return Ok(index);
        }
        self.open_step(0).await?;
        let (_, detected) = detect(&self.ctx).await?;
        Ok(detected.index().unwrap_or(0))
    }

    async fn open_step(&self, index: usize) -> Result<(), FlowError> {
        if let Some(url) = self.ctx.catalog().plan().url_for(index) {
            goto(&self.ctx, &url).await?;
        }
        Ok(())
    }

    /// Stop on arrival at the location screen, however the run got there.
    /// The stage names the step before it, which the site treats as done.
    async fn defer_location(&self, user: &UserRecord, location: &StepDescriptor) -> Outcome {
        let plan = self.ctx.catalog().plan();
        let before = location
            .position
            .checked_sub(1)
            .and_then(|position| plan.get(position))
            .unwrap_or(location);
        info!(stage = %before.name, "deferring location; stopping here");
        self.record_milestone(user, Milestone::RateStepCompleted).await;
        Outcome::success(before.name.as_str())
    }

    async fn stuck(&self, step: &StepDescriptor, url: &str) -> Result<Outcome, FlowError> {
        let evidence = match error_banner(&self.ctx).await? {
            Some(marker) => format!("step reported success but the page stayed at {url}; page says '{marker}'"),
            None => format!("step reported success but the page stayed at {url}"),
        };
        warn!(step = %step.name, %url, "step stuck");
        Ok(Outcome::error(
            codes::step(&step.name, codes::STEP_STUCK),
            evidence,
            step.name.as_str(),
        ))
    }

    async fn flag_captcha(
        &self,
        user: &UserRecord,
        step: &StepDescriptor,
        marker: &str,
    ) -> Result<Outcome, FlowError> {
        let port = self.proxies.rotate(user.proxy_port);
        warn!(marker, current = ?user.proxy_port, next = ?port, "captcha detected; rotating proxy");
        if let Err(err) = self
            .store
            .update_captcha_flag_and_proxy_port(&user.user_id, Utc::now(), port)
            .await
        {
            warn!(%err, "captcha flag not saved");
        }
        capture(&self.ctx, "captcha").await;
        Ok(Outcome::error(
            codes::CAPTCHA_DETECTED,
            format!("page shows '{marker}'"),
            step.name.as_str(),
        ))
    }

    async fn restore_session(&self, user: &UserRecord) {
        let Some(blob) = user.session_blob.as_deref() else {
            return;
        };
        match self.ctx.page().restore_session(blob).await {
            Ok(()) => debug!(bytes = blob.len(), "session restored"),
            Err(err) => warn!(%err, "session restore failed; starting fresh"),
        }
    }

    async fn save_session(&self, user: &UserRecord) {
        let blob = match self.ctx.page().export_session().await {
            Ok(blob) => blob,
            Err(err) => {
                warn!(%err, "session export failed");
                return;
            }
        };
        if let Err(err) = self.store.update_session_state(&user.user_id, &blob).await {
            warn!(%err, "session state not saved");
        }
    }

    async fn record_milestone(&self, user: &UserRecord, milestone: Milestone) {
        if let Err(err) = self
            .store
            .update_milestone(&user.user_id, milestone, Utc::now())
            .await
        {
            warn!(%err, ?milestone, "milestone not saved");
        }
    }
}

#[async_trait]
impl FlowExecutor for StepSequencer {
    async fn execute(&self, options: &RunOptions) -> Outcome {
        let outcome = match self.run(options).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(run = %self.ctx.run_id(), %err, "run aborted");
                Outcome::error(codes::UNEXPECTED_ERROR, err.to_string(), "sequencer").hard()
            }
        };

        if !outcome.is_success() {
            capture(&self.ctx, &format!("{}_failure", outcome.stage())).await;
        }
        let url = current_url(&self.ctx).await.unwrap_or_default();
        info!(
            run = %self.ctx.run_id(),
            status = ?outcome.status(),
            stage = outcome.stage(),
            code = outcome.error_code().unwrap_or_default(),
            "run finished"
        );
        outcome.at(url).with_screenshots(self.ctx.screenshots())
    }
}
