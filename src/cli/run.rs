use std::process::ExitCode;

use action_primitives::OutcomeStatus;
use anyhow::{Context, Result};
use clap::Args;
use formpilot_core_types::{RunOptions, StepName, UserId};
use tracing::info;

use crate::config::AppConfig;
use crate::runner::run_user;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// User id as stored in the users file
    #[arg(short, long)]
    pub user: String,

    /// Only verify what an earlier run entered; never re-enter data
    #[arg(long)]
    pub upload_only: bool,

    /// Skip phone verification and go straight to submission
    #[arg(long)]
    pub skip_otp: bool,

    /// Stop before the location screen and record the rate milestone
    #[arg(long)]
    pub defer_location: bool,

    /// Start at this step instead of the detected one
    #[arg(long, value_name = "STEP")]
    pub step: Option<String>,
}

impl RunArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            upload_only: self.upload_only,
            skip_otp: self.skip_otp,
            defer_location: self.defer_location,
            force_step: self.step.as_deref().map(StepName::from),
        }
    }
}

/// Prints the outcome as JSON on stdout. Exit status 0 only on success.
pub async fn cmd_run(args: RunArgs, config: &AppConfig) -> Result<ExitCode> {
    let options = args.options();
    info!(user = %args.user, ?options, "starting run");

    let outcome = run_user(config, UserId::new(args.user.clone()), &options).await?;
    let rendered = serde_json::to_string_pretty(&outcome).context("Failed to render outcome")?;
    println!("{rendered}");

    Ok(match outcome.status() {
        OutcomeStatus::Success => ExitCode::SUCCESS,
        OutcomeStatus::SoftFail => ExitCode::from(1),
        OutcomeStatus::HardFail => ExitCode::from(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_run_options() {
        let args = RunArgs {
            user: "u1".into(),
            upload_only: true,
            skip_otp: false,
            defer_location: true,
            step: Some("rate".into()),
        };
        let options = args.options();
        assert!(options.upload_only);
        assert!(!options.skip_otp);
        assert!(options.defer_location);
        assert_eq!(options.force_step, Some(StepName::from("rate")));
    }
}
