use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::Cdp;
use crate::commands::{AnchorDescriptor, ClearMethod, ElementRef, ElementState, ForcedState};
use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::util;

/// One Chromium instance with a single page, driven over CDP.
pub struct ChromiumPage {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    deadline: Duration,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionBlob {
    cookies: Vec<StoredCookie>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    local_storage: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
}

impl ChromiumPage {
    pub async fn launch(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_config = browser_config(cfg)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| io_err("failed to launch chromium", err))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", ?err, "cdp handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| io_err("failed to open page", err))?;

        info!(
            target: "cdp-adapter",
            headless = cfg.headless,
            proxy = cfg.proxy_server.as_deref().unwrap_or("none"),
            "chromium launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            deadline: Duration::from_millis(cfg.default_deadline_ms),
        })
    }

    /// Close the browser and stop the event handler.
    pub async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!(target: "cdp-adapter", ?err, "browser close failed");
        }
        let _ = browser.wait().await;
        self.handler.abort();
    }

    async fn element(&self, element: &ElementRef) -> Result<Element, AdapterError> {
        self.bounded(self.page.find_element(element.selector.as_str()))
            .await?
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("{}: {err}", element.label))
            })
    }

    async fn eval_value(&self, expression: &str) -> Result<Value, AdapterError> {
        let result = self
            .bounded(self.page.evaluate(expression))
            .await?
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Script).with_hint(err.to_string())
            })?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn resolve(
        &self,
        anchor: &AnchorDescriptor,
        include_hidden: bool,
    ) -> Result<Option<ElementRef>, AdapterError> {
        let token = Uuid::new_v4().simple().to_string();
        let script = util::resolve_script(anchor, &token, include_hidden);
        let value = self.eval_value(&script).await?;
        Ok(util::extract_selector(&value)
            .map(|(selector, label)| ElementRef::new(selector, label_or(label, anchor))))
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, AdapterError>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(self.deadline, fut).await.map_err(|_| {
            AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint("cdp call exceeded deadline")
                .retriable(true)
        })
    }
}

#[async_trait]
impl Cdp for ChromiumPage {
    async fn navigate(&self, url: &str, limit: Duration) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", url, "navigate");
        timeout(limit, self.page.goto(url))
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!("navigation to {url} timed out"))
                    .retriable(true)
            })?
            .map_err(|err| io_err("navigation failed", err))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        let url = self
            .bounded(self.page.url())
            .await?
            .map_err(|err| io_err("failed to read url", err))?;
        Ok(url.unwrap_or_default())
    }

    async fn query(&self, anchor: &AnchorDescriptor) -> Result<Option<ElementRef>, AdapterError> {
        self.resolve(anchor, false).await
    }

    async fn query_any(
        &self,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ElementRef>, AdapterError> {
        self.resolve(anchor, true).await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError> {
        let target = self.element(element).await?;
        self.bounded(target.click())
            .await?
            .map_err(|err| io_err("click failed", err))?;
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), AdapterError> {
        let target = self.element(element).await?;
        self.bounded(target.focus())
            .await?
            .map_err(|err| io_err("focus failed", err))?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError> {
        let target = self.element(element).await?;
        self.bounded(target.type_str(text))
            .await?
            .map_err(|err| io_err("typing failed", err))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), AdapterError> {
        let target = match self.page.find_element(":focus").await {
            Ok(found) => found,
            Err(_) => self
                .page
                .find_element("body")
                .await
                .map_err(|err| io_err("no key target", err))?,
        };
        self.bounded(target.press_key(key))
            .await?
            .map_err(|err| io_err("key press failed", err))?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef, method: ClearMethod) -> Result<(), AdapterError> {
        match method {
            ClearMethod::Keyboard => {
                self.eval_value(&util::select_all_script(&element.selector))
                    .await?;
                self.press_key("Backspace").await
            }
            ClearMethod::Script => {
                let cleared = self.eval_value(&util::clear_script(&element.selector)).await?;
                if cleared.as_bool() == Some(true) {
                    Ok(())
                } else {
                    Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint(format!("{} vanished before clear", element.label)))
                }
            }
        }
    }

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError> {
        let value = self
            .eval_value(&util::element_state_script(&element.selector))
            .await?;
        if value.is_null() {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{} is no longer attached", element.label)));
        }
        serde_json::from_value(value).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Script)
                .with_hint(format!("malformed element state: {err}"))
        })
    }

    async fn force_state(
        &self,
        element: &ElementRef,
        state: ForcedState,
    ) -> Result<(), AdapterError> {
        let applied = self
            .eval_value(&util::force_state_script(&element.selector, &state))
            .await?;
        if applied.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{} vanished before state write", element.label)))
        }
    }

    async fn page_text(&self) -> Result<String, AdapterError> {
        let value = self.eval_value(util::PAGE_TEXT_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        self.eval_value(expression).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AdapterError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.bounded(self.page.screenshot(params))
            .await?
            .map_err(|err| io_err("screenshot failed", err))
    }

    async fn upload_file(&self, element: &ElementRef, path: &Path) -> Result<(), AdapterError> {
        let target = self.element(element).await?;
        let mut params = SetFileInputFilesParams::new(vec![path.to_string_lossy().to_string()]);
        params.backend_node_id = Some(target.backend_node_id.clone());
        self.bounded(self.page.execute(params))
            .await?
            .map_err(|err| io_err("setting input files failed", err))?;
        Ok(())
    }

    async fn wait_network_idle(&self, quiet: Duration, limit: Duration) -> Result<(), AdapterError> {
        let started = Instant::now();
        let mut last_count = None;
        let mut stable_since = Instant::now();
        loop {
            let probe = self.eval_value(util::NETWORK_PROBE_SCRIPT).await?;
            let ready = probe.get("ready").and_then(Value::as_str) == Some("complete");
            let count = probe.get("resources").and_then(Value::as_u64);
            if count != last_count || !ready {
                last_count = count;
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= quiet {
                return Ok(());
            }
            if started.elapsed() >= limit {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint("network did not go idle")
                    .retriable(true));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn export_session(&self) -> Result<String, AdapterError> {
        let cookies = self
            .bounded(self.page.get_cookies())
            .await?
            .map_err(|err| io_err("failed to read cookies", err))?;
        let blob = SessionBlob {
            cookies: cookies
                .into_iter()
                .map(|c| StoredCookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain,
                    path: c.path,
                    secure: c.secure,
                    http_only: c.http_only,
                })
                .collect(),
            origin: self.current_url().await.ok(),
            local_storage: self.eval_value(util::EXPORT_STORAGE_SCRIPT).await?,
        };
        serde_json::to_string(&blob).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("session encode failed: {err}"))
        })
    }

    async fn restore_session(&self, blob: &str) -> Result<(), AdapterError> {
        let blob: SessionBlob = serde_json::from_str(blob).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("session decode failed: {err}"))
        })?;

        let mut params = Vec::with_capacity(blob.cookies.len());
        for cookie in blob.cookies {
            let param = CookieParam::builder()
                .name(cookie.name)
                .value(cookie.value)
                .domain(cookie.domain)
                .path(cookie.path)
                .secure(cookie.secure)
                .http_only(cookie.http_only)
                .build()
                .map_err(|err| {
                    AdapterError::new(AdapterErrorKind::Internal)
                        .with_hint(format!("bad stored cookie: {err}"))
                })?;
            params.push(param);
        }
        if !params.is_empty() {
            self.bounded(self.page.set_cookies(params))
                .await?
                .map_err(|err| io_err("failed to set cookies", err))?;
        }

        // localStorage is origin-bound; only restorable once that origin is loaded
        if let (Some(origin), Value::Object(entries)) = (blob.origin, &blob.local_storage) {
            if !entries.is_empty() && origin.starts_with("http") {
                self.navigate(&origin, self.deadline).await?;
                self.eval_value(&util::restore_storage_script(&blob.local_storage))
                    .await?;
            }
        }
        Ok(())
    }
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
            "chrome executable not found at {} (set FORMPILOT_CHROME)",
            cfg.executable.display()
        )));
    }

    let profile_dir = if cfg.user_data_dir.is_absolute() {
        cfg.user_data_dir.clone()
    } else {
        let cwd = std::env::current_dir().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
        })?;
        cwd.join(&cfg.user_data_dir)
    };
    fs::create_dir_all(&profile_dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to ensure user-data-dir: {err}"))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(Duration::from_secs(20))
        .window_size(cfg.window.0, cfg.window.1);

    if !cfg.headless {
        builder = builder.with_head();
    }

    let mut args = vec![
        "--disable-background-networking".to_string(),
        "--disable-breakpad".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--password-store=basic".to_string(),
    ];
    if cfg.headless {
        args.push("--headless=new".to_string());
    }
    if let Some(proxy) = &cfg.proxy_server {
        args.push(format!("--proxy-server={proxy}"));
    }
    builder = builder.args(args);

    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }
    builder = builder.user_data_dir(profile_dir);

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}

fn io_err(context: &str, err: CdpError) -> AdapterError {
    AdapterError::new(AdapterErrorKind::CdpIo)
        .with_hint(format!("{context}: {err}"))
        .retriable(true)
}

fn label_or(label: String, anchor: &AnchorDescriptor) -> String {
    if label.is_empty() {
        anchor.to_string()
    } else {
        label
    }
}
