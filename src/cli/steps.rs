use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::config::AppConfig;
use crate::runner::load_catalog;

#[derive(Args, Clone, Debug)]
pub struct StepsArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn cmd_steps(args: StepsArgs, config: &AppConfig) -> Result<ExitCode> {
    let catalog = load_catalog(config)?;
    let plan = catalog.plan();

    if args.json {
        let steps: Vec<_> = plan
            .iter()
            .map(|step| {
                json!({
                    "position": step.position,
                    "name": step.name.as_str(),
                    "url": plan.url_for(step.position),
                    "terminal": step.terminal,
                    "credentials": step.credentials,
                    "sensitive": step.sensitive,
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&steps).context("Failed to render plan")?;
        println!("{rendered}");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", plan.base_url());
    for step in plan.iter() {
        let mut roles = Vec::new();
        if let Some(kind) = step.terminal {
            roles.push(format!("terminal:{kind:?}").to_lowercase());
        }
        if step.credentials {
            roles.push("credentials".to_string());
        }
        if step.sensitive {
            roles.push("sensitive".to_string());
        }
        println!(
            "{:>3}  {:<16} {:<40} {}",
            step.position,
            step.name.as_str(),
            step.fragment,
            roles.join(",")
        );
    }
    Ok(ExitCode::SUCCESS)
}
