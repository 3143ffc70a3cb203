use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Also print where the user-level config file is looked up
    #[arg(long)]
    pub paths: bool,
}

pub async fn cmd_config(args: ConfigArgs, config: &AppConfig) -> Result<ExitCode> {
    if args.paths {
        match AppConfig::user_config_path() {
            Some(path) => eprintln!("user config: {}", path.display()),
            None => eprintln!("user config: unavailable on this platform"),
        }
    }
    let rendered = serde_json::to_string_pretty(config).context("Failed to render config")?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
