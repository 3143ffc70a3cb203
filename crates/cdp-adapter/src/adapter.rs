use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::commands::{AnchorDescriptor, ClearMethod, ElementRef, ElementState, ForcedState};
use crate::error::AdapterError;

/// Single-page browser control surface consumed by the action layers.
///
/// Every call is bounded by the adapter's own deadline. `query` only returns
/// elements that are currently visible; `query_any` also returns hidden ones
/// (file inputs are usually hidden behind a styled button).
#[async_trait]
pub trait Cdp: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn query(&self, anchor: &AnchorDescriptor) -> Result<Option<ElementRef>, AdapterError>;

    async fn query_any(&self, anchor: &AnchorDescriptor)
        -> Result<Option<ElementRef>, AdapterError>;

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError>;

    async fn focus(&self, element: &ElementRef) -> Result<(), AdapterError>;

    /// Type a chunk of text into the focused element.
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError>;

    /// Dispatch a named key ("Enter", "Tab", "Escape", "ArrowDown", ...).
    async fn press_key(&self, key: &str) -> Result<(), AdapterError>;

    async fn clear(&self, element: &ElementRef, method: ClearMethod) -> Result<(), AdapterError>;

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError>;

    async fn force_state(
        &self,
        element: &ElementRef,
        state: ForcedState,
    ) -> Result<(), AdapterError>;

    /// Visible text of the whole document body.
    async fn page_text(&self) -> Result<String, AdapterError>;

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, AdapterError>;

    async fn upload_file(&self, element: &ElementRef, path: &Path) -> Result<(), AdapterError>;

    /// Wait until no requests have been in flight for `quiet`, bounded by `timeout`.
    async fn wait_network_idle(&self, quiet: Duration, timeout: Duration)
        -> Result<(), AdapterError>;

    /// Serialize cookies and storage into an opaque blob.
    async fn export_session(&self) -> Result<String, AdapterError>;

    async fn restore_session(&self, blob: &str) -> Result<(), AdapterError>;
}
