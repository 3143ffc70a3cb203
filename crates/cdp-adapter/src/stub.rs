//! Deterministic in-memory page used by tests across the workspace.
//!
//! Elements are scripted up-front with the anchors that find them, the URL
//! they live on and the effects a click, keystroke or upload has. Every
//! interaction is recorded in a [`PageLog`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::adapter::Cdp;
use crate::commands::{AnchorDescriptor, ClearMethod, ElementRef, ElementState, ForcedState};
use crate::error::{AdapterError, AdapterErrorKind};

const SELECTOR_PREFIX: &str = "[data-formpilot-ref=\"";
const SELECTOR_SUFFIX: &str = "\"]";

/// State change triggered by an interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Navigate(String),
    Show(String),
    Hide(String),
    SetValue { key: String, value: String },
    SetChecked { key: String, checked: bool },
    SetText { key: String, text: String },
    SetPageText(String),
    AppendPageText(String),
}

/// Scripted element.
#[derive(Clone, Debug)]
pub struct FakeElement {
    key: String,
    anchors: Vec<AnchorDescriptor>,
    on_url: Option<String>,
    visible: bool,
    tag: String,
    input_type: Option<String>,
    id: Option<String>,
    name: Option<String>,
    value: String,
    checked: bool,
    text: String,
    on_click: Vec<Effect>,
    on_type: Vec<Effect>,
    on_upload: Vec<Effect>,
    drop_clicks: usize,
    sticky_value: Option<String>,
    read_only: bool,
    ignore_keyboard_clear: bool,
    ignore_forced_state: bool,
    upload_error: Option<String>,
}

impl FakeElement {
    pub fn new(key: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            anchors: Vec::new(),
            on_url: None,
            visible: true,
            tag: tag.into(),
            input_type: None,
            id: None,
            name: None,
            value: String::new(),
            checked: false,
            text: String::new(),
            on_click: Vec::new(),
            on_type: Vec::new(),
            on_upload: Vec::new(),
            drop_clicks: 0,
            sticky_value: None,
            read_only: false,
            ignore_keyboard_clear: false,
            ignore_forced_state: false,
            upload_error: None,
        }
    }

    pub fn button(key: impl Into<String>) -> Self {
        Self::new(key, "button")
    }

    pub fn text_input(key: impl Into<String>) -> Self {
        Self::new(key, "input").input_type("text")
    }

    pub fn checkbox(key: impl Into<String>) -> Self {
        Self::new(key, "input").input_type("checkbox")
    }

    pub fn radio(key: impl Into<String>) -> Self {
        Self::new(key, "input").input_type("radio")
    }

    pub fn file_input(key: impl Into<String>) -> Self {
        Self::new(key, "input").input_type("file")
    }

    pub fn input_type(mut self, kind: impl Into<String>) -> Self {
        self.input_type = Some(kind.into());
        self
    }

    pub fn anchor(mut self, anchor: AnchorDescriptor) -> Self {
        self.anchors.push(anchor);
        self
    }

    /// Add anchors in their text form; unparsable entries are ignored.
    pub fn anchors<'a>(mut self, raw: impl IntoIterator<Item = &'a str>) -> Self {
        self.anchors
            .extend(raw.into_iter().filter_map(|item| item.parse().ok()));
        self
    }

    /// Only present while the URL contains `fragment`.
    pub fn on_url(mut self, fragment: impl Into<String>) -> Self {
        self.on_url = Some(fragment.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn on_type(mut self, effect: Effect) -> Self {
        self.on_type.push(effect);
        self
    }

    pub fn on_upload(mut self, effect: Effect) -> Self {
        self.on_upload.push(effect);
        self
    }

    /// Swallow the first `count` clicks without any effect.
    pub fn drop_clicks(mut self, count: usize) -> Self {
        self.drop_clicks = count;
        self
    }

    /// Value the element reports no matter what is typed.
    pub fn sticky_value(mut self, value: impl Into<String>) -> Self {
        self.sticky_value = Some(value.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn ignore_keyboard_clear(mut self) -> Self {
        self.ignore_keyboard_clear = true;
        self
    }

    pub fn ignore_forced_state(mut self) -> Self {
        self.ignore_forced_state = true;
        self
    }

    pub fn upload_error(mut self, message: impl Into<String>) -> Self {
        self.upload_error = Some(message.into());
        self
    }

    fn present_on(&self, url: &str) -> bool {
        self.on_url
            .as_deref()
            .map(|fragment| url.contains(fragment))
            .unwrap_or(true)
    }

    fn matches(&self, anchor: &AnchorDescriptor) -> bool {
        if self.anchors.iter().any(|candidate| candidate == anchor) {
            return true;
        }
        match anchor {
            AnchorDescriptor::Text { content, exact } if !self.text.is_empty() => {
                let wanted = content.trim().to_lowercase();
                let own = self.text.trim().to_lowercase();
                if *exact {
                    own == wanted
                } else {
                    own.contains(&wanted)
                }
            }
            _ => false,
        }
    }

    fn state(&self) -> ElementState {
        ElementState {
            tag: self.tag.clone(),
            input_type: self.input_type.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            value: self
                .sticky_value
                .clone()
                .unwrap_or_else(|| self.value.clone()),
            checked: self.checked,
            text: self.text.clone(),
        }
    }

    fn reference(&self) -> ElementRef {
        ElementRef::new(
            format!("{SELECTOR_PREFIX}{}{SELECTOR_SUFFIX}", self.key),
            self.key.clone(),
        )
    }
}

/// Everything the page observed.
#[derive(Clone, Debug, Default)]
pub struct PageLog {
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub keys: Vec<String>,
    pub clears: Vec<(String, ClearMethod)>,
    pub forced: Vec<(String, ForcedState)>,
    pub uploads: Vec<(String, PathBuf)>,
    pub restored: Vec<String>,
    pub exported: usize,
    pub screenshots: usize,
    pub network_waits: usize,
}

impl PageLog {
    /// Concatenation of everything typed into one element.
    pub fn typed_into(&self, key: &str) -> String {
        self.typed
            .iter()
            .filter(|(target, _)| target == key)
            .map(|(_, chunk)| chunk.as_str())
            .collect()
    }

    pub fn clicks_on(&self, key: &str) -> usize {
        self.clicks.iter().filter(|target| *target == key).count()
    }
}

#[derive(Debug)]
struct KeyBinding {
    on_url: Option<String>,
    key: String,
    effects: Vec<Effect>,
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    elements: Vec<FakeElement>,
    page_text: String,
    focused: Option<String>,
    key_bindings: Vec<KeyBinding>,
    evaluations: Vec<(String, Value)>,
    blocked_urls: Vec<String>,
    failing_urls: Vec<String>,
    fail_screenshots: bool,
    fail_restore: bool,
    fail_export: bool,
    session_export: Option<String>,
    log: PageLog,
}

impl PageState {
    fn live(&self, key: &str) -> Option<&FakeElement> {
        self.elements
            .iter()
            .find(|el| el.key == key && el.present_on(&self.url))
    }

    fn live_mut(&mut self, key: &str) -> Option<&mut FakeElement> {
        let url = self.url.clone();
        self.elements
            .iter_mut()
            .find(|el| el.key == key && el.present_on(&url))
    }

    fn any_mut(&mut self, key: &str) -> Option<&mut FakeElement> {
        self.elements.iter_mut().find(|el| el.key == key)
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Navigate(url) => {
                    self.url = url;
                    self.focused = None;
                }
                Effect::Show(key) => {
                    if let Some(el) = self.any_mut(&key) {
                        el.visible = true;
                    }
                }
                Effect::Hide(key) => {
                    if let Some(el) = self.any_mut(&key) {
                        el.visible = false;
                    }
                }
                Effect::SetValue { key, value } => {
                    if let Some(el) = self.any_mut(&key) {
                        el.value = value;
                    }
                }
                Effect::SetChecked { key, checked } => {
                    if let Some(el) = self.any_mut(&key) {
                        el.checked = checked;
                    }
                }
                Effect::SetText { key, text } => {
                    if let Some(el) = self.any_mut(&key) {
                        el.text = text;
                    }
                }
                Effect::SetPageText(text) => self.page_text = text,
                Effect::AppendPageText(text) => {
                    if !self.page_text.is_empty() {
                        self.page_text.push('\n');
                    }
                    self.page_text.push_str(&text);
                }
            }
        }
    }
}

/// Scripted single-page browser.
#[derive(Debug, Default)]
pub struct ScriptedPage {
    state: Mutex<PageState>,
}

impl ScriptedPage {
    pub fn new(url: impl Into<String>) -> Self {
        let page = Self::default();
        page.state.lock().url = url.into();
        page
    }

    pub fn add(&self, element: FakeElement) -> &Self {
        self.state.lock().elements.push(element);
        self
    }

    /// Bind effects to a key press, optionally only while the URL contains `on_url`.
    pub fn on_key(&self, on_url: Option<&str>, key: &str, effects: Vec<Effect>) -> &Self {
        self.state.lock().key_bindings.push(KeyBinding {
            on_url: on_url.map(str::to_string),
            key: key.to_string(),
            effects,
        });
        self
    }

    /// Result returned when `expression` is evaluated.
    pub fn on_evaluate(&self, expression: &str, value: Value) -> &Self {
        self.state
            .lock()
            .evaluations
            .push((expression.to_string(), value));
        self
    }

    /// Navigations to URLs containing `fragment` succeed but leave the page where it was.
    pub fn block_navigation(&self, fragment: &str) -> &Self {
        self.state.lock().blocked_urls.push(fragment.to_string());
        self
    }

    /// Navigations to URLs containing `fragment` error out.
    pub fn fail_navigation(&self, fragment: &str) -> &Self {
        self.state.lock().failing_urls.push(fragment.to_string());
        self
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    pub fn set_page_text(&self, text: impl Into<String>) {
        self.state.lock().page_text = text.into();
    }

    pub fn fail_screenshots(&self, fail: bool) {
        self.state.lock().fail_screenshots = fail;
    }

    pub fn fail_restore(&self, fail: bool) {
        self.state.lock().fail_restore = fail;
    }

    pub fn fail_export(&self, fail: bool) {
        self.state.lock().fail_export = fail;
    }

    pub fn set_session_export(&self, blob: impl Into<String>) {
        self.state.lock().session_export = Some(blob.into());
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn log(&self) -> PageLog {
        self.state.lock().log.clone()
    }

    /// Current state of an element regardless of the URL it lives on.
    pub fn element(&self, key: &str) -> Option<ElementState> {
        self.state
            .lock()
            .elements
            .iter()
            .find(|el| el.key == key)
            .map(FakeElement::state)
    }

    fn find(&self, anchor: &AnchorDescriptor, include_hidden: bool) -> Option<ElementRef> {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .filter(|el| el.present_on(&state.url))
            .filter(|el| include_hidden || el.visible)
            .find(|el| el.matches(anchor))
            .map(FakeElement::reference)
    }
}

fn key_of(element: &ElementRef) -> &str {
    element
        .selector
        .strip_prefix(SELECTOR_PREFIX)
        .and_then(|rest| rest.strip_suffix(SELECTOR_SUFFIX))
        .unwrap_or(element.selector.as_str())
}

fn detached(element: &ElementRef) -> AdapterError {
    AdapterError::new(AdapterErrorKind::TargetNotFound)
        .with_hint(format!("{} is not on the page", element.label))
}

#[async_trait]
impl Cdp for ScriptedPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.log.navigations.push(url.to_string());
        if state.failing_urls.iter().any(|f| url.contains(f.as_str())) {
            return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("navigation to {url} timed out"))
                .retriable(true));
        }
        if state.blocked_urls.iter().any(|f| url.contains(f.as_str())) {
            return Ok(());
        }
        state.url = url.to_string();
        state.focused = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.state.lock().url.clone())
    }

    async fn query(&self, anchor: &AnchorDescriptor) -> Result<Option<ElementRef>, AdapterError> {
        Ok(self.find(anchor, false))
    }

    async fn query_any(
        &self,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ElementRef>, AdapterError> {
        Ok(self.find(anchor, true))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        let effects = {
            let target = state.live_mut(&key).ok_or_else(|| detached(element))?;
            if target.drop_clicks > 0 {
                target.drop_clicks -= 1;
                None
            } else {
                match target.input_type.as_deref() {
                    Some("checkbox") => target.checked = !target.checked,
                    Some("radio") => target.checked = true,
                    _ => {}
                }
                Some(target.on_click.clone())
            }
        };
        state.log.clicks.push(key.clone());
        state.focused = Some(key);
        if let Some(effects) = effects {
            state.apply(effects);
        }
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        state.live(&key).ok_or_else(|| detached(element))?;
        state.focused = Some(key);
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        let effects = {
            let target = state.live_mut(&key).ok_or_else(|| detached(element))?;
            if !target.read_only {
                target.value.push_str(text);
            }
            target.on_type.clone()
        };
        state.log.typed.push((key, text.to_string()));
        state.apply(effects);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.log.keys.push(key.to_string());
        let url = state.url.clone();
        let effects: Vec<Effect> = state
            .key_bindings
            .iter()
            .filter(|binding| binding.key == key)
            .filter(|binding| {
                binding
                    .on_url
                    .as_deref()
                    .map(|fragment| url.contains(fragment))
                    .unwrap_or(true)
            })
            .flat_map(|binding| binding.effects.clone())
            .collect();
        state.apply(effects);
        Ok(())
    }

    async fn clear(&self, element: &ElementRef, method: ClearMethod) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        {
            let target = state.live_mut(&key).ok_or_else(|| detached(element))?;
            let ignored = target.read_only
                || (method == ClearMethod::Keyboard && target.ignore_keyboard_clear);
            if !ignored {
                target.value.clear();
            }
        }
        state.log.clears.push((key, method));
        Ok(())
    }

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError> {
        let state = self.state.lock();
        state
            .live(key_of(element))
            .map(FakeElement::state)
            .ok_or_else(|| detached(element))
    }

    async fn force_state(
        &self,
        element: &ElementRef,
        forced: ForcedState,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        {
            let target = state.live_mut(&key).ok_or_else(|| detached(element))?;
            if !target.ignore_forced_state {
                match &forced {
                    ForcedState::Checked(flag) => target.checked = *flag,
                    ForcedState::Value(value) => target.value = value.clone(),
                }
            }
        }
        state.log.forced.push((key, forced));
        Ok(())
    }

    async fn page_text(&self) -> Result<String, AdapterError> {
        let state = self.state.lock();
        let mut text = state.page_text.clone();
        for el in state
            .elements
            .iter()
            .filter(|el| el.visible && el.present_on(&state.url) && !el.text.is_empty())
        {
            text.push('\n');
            text.push_str(&el.text);
        }
        Ok(text)
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        let state = self.state.lock();
        Ok(state
            .evaluations
            .iter()
            .find(|(expr, _)| expr == expression)
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AdapterError> {
        let mut state = self.state.lock();
        if state.fail_screenshots {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint("capture failed"));
        }
        state.log.screenshots += 1;
        Ok(b"\x89PNG\r\n\x1a\nstub".to_vec())
    }

    async fn upload_file(&self, element: &ElementRef, path: &Path) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let key = key_of(element).to_string();
        let effects = {
            let target = state
                .elements
                .iter()
                .find(|el| el.key == key && el.present_on(&state.url))
                .ok_or_else(|| detached(element))?;
            if let Some(message) = &target.upload_error {
                return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(message.clone()));
            }
            target.on_upload.clone()
        };
        state.log.uploads.push((key, path.to_path_buf()));
        state.apply(effects);
        Ok(())
    }

    async fn wait_network_idle(
        &self,
        _quiet: Duration,
        _timeout: Duration,
    ) -> Result<(), AdapterError> {
        self.state.lock().log.network_waits += 1;
        Ok(())
    }

    async fn export_session(&self) -> Result<String, AdapterError> {
        let mut state = self.state.lock();
        if state.fail_export {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint("cookie read failed"));
        }
        state.log.exported += 1;
        Ok(state
            .session_export
            .clone()
            .unwrap_or_else(|| format!("session@{}", state.url)))
    }

    async fn restore_session(&self, blob: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if state.fail_restore {
            return Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("bad session blob"));
        }
        state.log.restored.push(blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elements_follow_their_url() {
        let page = ScriptedPage::new("https://w.test/a");
        page.add(
            FakeElement::button("next")
                .anchors(["aria:button=Next"])
                .on_url("/a")
                .on_click(Effect::Navigate("https://w.test/b".into())),
        );
        let anchor: AnchorDescriptor = "aria:button=Next".parse().unwrap();
        let next = page.query(&anchor).await.unwrap().unwrap();
        page.click(&next).await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "https://w.test/b");
        assert!(page.query(&anchor).await.unwrap().is_none());
        assert!(page.click(&next).await.is_err());
    }

    #[tokio::test]
    async fn hidden_elements_need_query_any() {
        let page = ScriptedPage::new("https://w.test/a");
        page.add(FakeElement::file_input("upload").anchors(["css:input[type=file]"]).hidden());
        let anchor = AnchorDescriptor::css("input[type=file]");
        assert!(page.query(&anchor).await.unwrap().is_none());
        assert!(page.query_any(&anchor).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn checkbox_clicks_toggle_and_can_be_dropped() {
        let page = ScriptedPage::new("https://w.test/a");
        page.add(FakeElement::checkbox("terms").text("I agree").drop_clicks(1));
        let terms = page
            .query(&AnchorDescriptor::text("agree"))
            .await
            .unwrap()
            .unwrap();
        page.click(&terms).await.unwrap();
        assert!(!page.element_state(&terms).await.unwrap().checked);
        page.click(&terms).await.unwrap();
        assert!(page.element_state(&terms).await.unwrap().checked);
        assert_eq!(page.log().clicks_on("terms"), 2);
    }

    #[tokio::test]
    async fn keyboard_clear_can_be_resisted() {
        let page = ScriptedPage::new("https://w.test/a");
        page.add(
            FakeElement::text_input("pw")
                .anchors(["css:#pw"])
                .value("stale")
                .ignore_keyboard_clear(),
        );
        let pw = page.query(&AnchorDescriptor::css("#pw")).await.unwrap().unwrap();
        page.clear(&pw, ClearMethod::Keyboard).await.unwrap();
        assert_eq!(page.element_state(&pw).await.unwrap().value, "stale");
        page.clear(&pw, ClearMethod::Script).await.unwrap();
        assert_eq!(page.element_state(&pw).await.unwrap().value, "");
    }
}
