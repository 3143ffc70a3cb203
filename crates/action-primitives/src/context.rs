//! Per-run context passed explicitly through the whole call chain.

use std::sync::Arc;

use action_locator::SelectorCatalog;
use cdp_adapter::Cdp;
use formpilot_core_types::{RunId, UserId};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::pacing::{HumanPacer, Pacer};
use crate::screenshots::{NullScreenshotSink, ScreenshotSink};
use crate::types::{RetryPolicy, Timing};

/// Everything one run needs: the page it exclusively owns, its pacing and
/// timing, the selector catalog and the screenshots captured so far.
pub struct RunCtx {
    run_id: RunId,
    user_id: UserId,
    page: Arc<dyn Cdp>,
    pacer: Arc<dyn Pacer>,
    catalog: Arc<SelectorCatalog>,
    sink: Arc<dyn ScreenshotSink>,
    timing: Timing,
    retry: RetryPolicy,
    screenshots: Mutex<IndexMap<String, String>>,
}

impl RunCtx {
    pub fn builder(
        user_id: UserId,
        page: Arc<dyn Cdp>,
        catalog: Arc<SelectorCatalog>,
    ) -> RunCtxBuilder {
        RunCtxBuilder {
            run_id: None,
            user_id,
            page,
            catalog,
            pacer: None,
            sink: None,
            timing: Timing::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn page(&self) -> &dyn Cdp {
        self.page.as_ref()
    }

    pub fn pacer(&self) -> &dyn Pacer {
        self.pacer.as_ref()
    }

    pub fn catalog(&self) -> &SelectorCatalog {
        &self.catalog
    }

    pub fn sink(&self) -> &dyn ScreenshotSink {
        self.sink.as_ref()
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Record a checkpoint. A repeated name keeps its original position.
    pub fn record_screenshot(&self, name: &str, reference: String) {
        self.screenshots.lock().insert(name.to_string(), reference);
    }

    /// Snapshot of the checkpoints captured so far, in capture order.
    pub fn screenshots(&self) -> IndexMap<String, String> {
        self.screenshots.lock().clone()
    }
}

pub struct RunCtxBuilder {
    run_id: Option<RunId>,
    user_id: UserId,
    page: Arc<dyn Cdp>,
    catalog: Arc<SelectorCatalog>,
    pacer: Option<Arc<dyn Pacer>>,
    sink: Option<Arc<dyn ScreenshotSink>>,
    timing: Timing,
    retry: RetryPolicy,
}

impl RunCtxBuilder {
    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ScreenshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> RunCtx {
        RunCtx {
            run_id: self.run_id.unwrap_or_default(),
            user_id: self.user_id,
            page: self.page,
            pacer: self.pacer.unwrap_or_else(|| Arc::new(HumanPacer)),
            catalog: self.catalog,
            sink: self.sink.unwrap_or_else(|| Arc::new(NullScreenshotSink)),
            timing: self.timing,
            retry: self.retry,
            screenshots: Mutex::new(IndexMap::new()),
        }
    }
}
