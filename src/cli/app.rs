use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use super::commands::Commands;
use super::config::cmd_config;
use super::env::CliArgs;
use super::run::cmd_run;
use super::steps::cmd_steps;
use crate::config::AppConfig;
use crate::logging::init_logging;

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let _logging = init_logging(&config, cli.log_level.as_deref(), cli.json_logs)?;
    debug!(
        "formpilot v{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE")
    );

    match dispatch(cli.command, &config).await {
        Ok(code) => Ok(code),
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}

pub async fn dispatch(command: Commands, config: &AppConfig) -> Result<ExitCode> {
    match command {
        Commands::Run(args) => cmd_run(args, config).await,
        Commands::Steps(args) => cmd_steps(args, config).await,
        Commands::Config(args) => cmd_config(args, config).await,
    }
}
