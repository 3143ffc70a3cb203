//! Configuration management module
//!
//! Layers, lowest priority first: built-in defaults, the user config
//! (`<config_dir>/formpilot/formpilot.toml`), `./formpilot.toml`, an explicit
//! `--config` file, then `FORMPILOT__SECTION__KEY` environment variables.

use std::path::{Path, PathBuf};

use action_primitives::{RetryPolicy, Timing};
use anyhow::{Context, Result};
use formpilot_state_center::ProxyPool;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "formpilot";
const LOCAL_CONFIG: &str = "formpilot.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserSection,
    pub wizard: WizardSection,
    pub timing: Timing,
    pub retry: RetryPolicy,
    pub proxy: ProxyPool,
    pub paths: PathsSection,
    pub otp: OtpSection,
    pub logging: LoggingSection,
}

/// Overrides for the launched Chromium. Unset values fall back to the
/// adapter's own detection (`FORMPILOT_CHROME`, `FORMPILOT_HEADLESS`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSection {
    /// Deployment to drive instead of the catalog's own base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Selector catalog replacing the embedded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub users: PathBuf,
    pub screenshots: PathBuf,
    pub otp_dir: PathBuf,
    /// Second drop directory, polled when nothing arrives in `otp_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_fallback_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        let data = data_dir();
        Self {
            users: data.join("users.json"),
            screenshots: data.join("screenshots"),
            otp_dir: data.join("otp"),
            otp_fallback_dir: None,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSection {
    pub timeout_secs: u64,
}

impl Default for OtpSection {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let defaults = serde_json::to_string(&AppConfig::default())
            .context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults,
            config::FileFormat::Json,
        ));

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            builder = builder.add_source(config::File::from(local));
        }

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FORMPILOT")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("proxy.ports")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(LOCAL_CONFIG))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".formpilot"))
}
