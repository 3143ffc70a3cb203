//! Wiring for one run: catalog, store, browser and the step sequencer.

use std::sync::Arc;

use action_flow::{
    FileDropOtpProvider, FlowExecutor, HandlerRegistry, OtpChain, StepSequencer,
};
use action_locator::SelectorCatalog;
use action_primitives::{codes, DirScreenshotSink, HumanPacer, Outcome, RunCtx};
use anyhow::{Context, Result};
use cdp_adapter::{Cdp, CdpConfig, ChromiumPage};
use formpilot_core_types::{RunOptions, UserId};
use formpilot_state_center::{JsonFileUserStore, UserStore};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Embedded catalog, or the configured override, pointed at the configured
/// deployment.
pub fn load_catalog(config: &AppConfig) -> Result<SelectorCatalog> {
    let catalog = SelectorCatalog::load_or_embedded(config.wizard.catalog.as_deref())
        .context("Failed to load the selector catalog")?;
    match &config.wizard.base_url {
        Some(base_url) => catalog
            .with_base_url(base_url)
            .context("Invalid wizard base URL"),
        None => Ok(catalog),
    }
}

/// Browser settings for a user pinned to `proxy_port`.
pub fn browser_config(config: &AppConfig, proxy_port: Option<u16>) -> CdpConfig {
    let mut cdp = CdpConfig::default();
    if let Some(executable) = &config.browser.executable {
        cdp.executable = executable.clone();
    }
    if let Some(headless) = config.browser.headless {
        cdp.headless = headless;
    }
    if let Some(profile_dir) = &config.browser.profile_dir {
        cdp.user_data_dir = profile_dir.clone();
    }
    cdp.default_deadline_ms = config.timing.navigation_timeout_ms;
    match proxy_port {
        Some(port) if !config.proxy.host.is_empty() => cdp.with_proxy(&config.proxy.host, port),
        _ => cdp,
    }
}

/// File-drop OTP providers: `paths.otp_dir`, then `paths.otp_fallback_dir`
/// when configured.
pub fn otp_chain(config: &AppConfig) -> OtpChain {
    let chain = OtpChain::new(Arc::new(FileDropOtpProvider::new(config.paths.otp_dir.clone())));
    match &config.paths.otp_fallback_dir {
        Some(dir) => chain.with_fallback(Arc::new(FileDropOtpProvider::new(dir.clone()))),
        None => chain,
    }
}

/// Sequencer over an already open page.
pub fn build_sequencer(
    config: &AppConfig,
    page: Arc<dyn Cdp>,
    catalog: Arc<SelectorCatalog>,
    store: Arc<dyn UserStore>,
    user_id: UserId,
) -> StepSequencer {
    let ctx = RunCtx::builder(user_id, page, catalog.clone())
        .pacer(Arc::new(HumanPacer))
        .sink(Arc::new(DirScreenshotSink::new(config.paths.screenshots.clone())))
        .timing(config.timing.clone())
        .retry(config.retry)
        .build();
    StepSequencer::new(ctx, store, HandlerRegistry::for_plan(catalog.plan()))
        .with_otp(Arc::new(otp_chain(config)))
        .with_proxy_pool(config.proxy.clone())
        .with_otp_timeout(config.otp.timeout_secs)
}

/// Run the wizard for one user in a fresh Chromium. Unknown users are
/// reported without launching a browser.
pub async fn run_user(config: &AppConfig, user_id: UserId, options: &RunOptions) -> Result<Outcome> {
    let catalog = Arc::new(load_catalog(config)?);
    let store: Arc<dyn UserStore> = Arc::new(JsonFileUserStore::new(config.paths.users.clone()));

    let Some(record) = store
        .get_user(&user_id)
        .await
        .context("Failed to read the user store")?
    else {
        return Ok(Outcome::error(
            codes::USER_NOT_FOUND,
            format!("no record for user {user_id}"),
            "setup",
        ));
    };

    let cdp = browser_config(config, record.proxy_port);
    let page = Arc::new(
        ChromiumPage::launch(&cdp)
            .await
            .context("Failed to launch Chromium")?,
    );
    info!(user = %user_id, proxy_port = ?record.proxy_port, "browser ready");

    let sequencer = build_sequencer(config, page.clone(), catalog, store, user_id);
    let outcome = sequencer.execute(options).await;
    page.shutdown().await;
    if !outcome.is_success() {
        warn!(code = outcome.error_code().unwrap_or_default(), "run did not complete");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::OtpProvider;

    #[test]
    fn base_url_override_moves_the_plan() {
        let mut config = AppConfig::default();
        config.wizard.base_url = Some("https://staging.market.test".into());
        let catalog = load_catalog(&config).unwrap();
        assert_eq!(
            catalog.plan().url_for(0).unwrap(),
            "https://staging.market.test/nx/signup"
        );
    }

    #[tokio::test]
    async fn unknown_user_is_reported_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.users = dir.path().join("users.json");
        config.browser.executable = Some(dir.path().join("no-such-chrome"));

        let outcome = run_user(&config, UserId::new("ghost"), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.error_code(), Some("USER_NOT_FOUND"));
    }

    #[tokio::test]
    async fn otp_fallback_dir_is_polled_after_the_primary() {
        let primary = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        std::fs::write(fallback.path().join("u1.otp"), "731904").unwrap();

        let mut config = AppConfig::default();
        config.paths.otp_dir = primary.path().to_path_buf();
        assert_eq!(otp_chain(&config).len(), 1);

        config.paths.otp_fallback_dir = Some(fallback.path().to_path_buf());
        let chain = otp_chain(&config);
        assert_eq!(chain.len(), 2);
        let code = chain.wait_for_otp(&UserId::new("u1"), "1", 0).await.unwrap();
        assert_eq!(code.as_deref(), Some("731904"));
    }

    #[test]
    fn proxy_needs_a_host_and_a_port() {
        let mut config = AppConfig::default();
        assert!(browser_config(&config, Some(9001)).proxy_server.is_none());

        config.proxy.host = "10.0.0.2".into();
        assert!(browser_config(&config, None).proxy_server.is_none());
        assert_eq!(
            browser_config(&config, Some(9001)).proxy_server.as_deref(),
            Some("10.0.0.2:9001")
        );
    }
}
