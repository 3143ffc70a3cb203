//! Logging initialization
//!
//! Human-readable or JSON lines on stderr (stdout carries the run outcome),
//! plus a daily-rolling file under `paths.log_dir` when one is configured.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::AppConfig;

/// Must be kept alive for the duration of the program; dropping it flushes
/// the file log.
pub struct LoggingHandle {
    pub _guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &AppConfig, level_override: Option<&str>, json: bool) -> Result<LoggingHandle> {
    let level = level_override.unwrap_or(config.logging.level.as_str());
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("Invalid log level")?,
    };
    let json = json || config.logging.json;

    let stderr = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file, guard) = match &config.paths.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "formpilot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(LoggingHandle { _guard: guard })
}
