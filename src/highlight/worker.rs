//! Parser round trip: debounce scheduling and the `fetch` transport
//!
//! The background worker posts the whole document to the parser endpoint
//! once edits have been quiet for the configured delay. Unchanged text is
//! not posted again.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response, Window, WorkerGlobalScope};

use crate::highlight::config::HighlightConfig;
use crate::highlight::error::{HighlightError, Result};

// =============================================================================
// ParseScheduler
// =============================================================================

/// Counters exposed for debugging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub dispatched: u32,
    pub skipped: u32,
}

/// Debounces document changes into parser requests
#[wasm_bindgen]
pub struct ParseScheduler {
    delay_ms: f64,
    /// Time of the most recent unparsed change
    pending_since: Option<f64>,
    /// Hash of the text most recently handed to the transport
    last_sent: Option<u64>,
    stats: SchedulerStats,
}

impl ParseScheduler {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms: f64::from(delay_ms),
            pending_since: None,
            last_sent: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Scheduler using the configured debounce
    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::new(config.parse_delay_ms)
    }

    /// Record an edit; restarts the quiet period
    pub fn note_change(&mut self, now_ms: f64) {
        self.pending_since = Some(now_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// True when `text` should be posted now.
    ///
    /// Consumes the pending change once the quiet period has elapsed, even
    /// if the text turns out to be unchanged.
    pub fn poll(&mut self, now_ms: f64, text: &str) -> bool {
        let Some(since) = self.pending_since else {
            return false;
        };
        if now_ms - since < self.delay_ms {
            return false;
        }
        self.pending_since = None;

        let hash = content_hash(text);
        if self.last_sent == Some(hash) {
            self.stats.skipped += 1;
            return false;
        }
        self.last_sent = Some(hash);
        self.stats.dispatched += 1;
        true
    }

    /// The last post failed: the same text must be sent again next time
    pub fn mark_failed(&mut self) {
        self.last_sent = None;
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

#[wasm_bindgen]
impl ParseScheduler {
    #[wasm_bindgen(constructor)]
    pub fn js_new(delay_ms: u32) -> Self {
        Self::new(delay_ms)
    }

    #[wasm_bindgen(js_name = noteChange)]
    pub fn js_note_change(&mut self, now_ms: f64) {
        self.note_change(now_ms);
    }

    #[wasm_bindgen(js_name = poll)]
    pub fn js_poll(&mut self, now_ms: f64, text: &str) -> bool {
        self.poll(now_ms, text)
    }

    #[wasm_bindgen(js_name = markFailed)]
    pub fn js_mark_failed(&mut self) {
        self.mark_failed();
    }

    #[wasm_bindgen(js_name = isPending)]
    pub fn js_is_pending(&self) -> bool {
        self.is_pending()
    }

    #[wasm_bindgen(js_name = stats)]
    pub fn js_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.stats).unwrap_or(JsValue::NULL)
    }
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Transport
// =============================================================================

/// POST `text` to `endpoint` and return the response body.
///
/// Works from both a window and a worker global scope. Anything but HTTP 200
/// is a failure.
pub async fn fetch_vocabulary(endpoint: &str, text: &str) -> Result<String> {
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&JsValue::from_str(text));

    let request = Request::new_with_str_and_init(endpoint, &init).map_err(transport_error)?;

    let global = js_sys::global();
    let promise = if let Some(scope) = global.dyn_ref::<WorkerGlobalScope>() {
        scope.fetch_with_request(&request)
    } else if let Some(window) = global.dyn_ref::<Window>() {
        window.fetch_with_request(&request)
    } else {
        return Err(HighlightError::Transport("no fetch in this context".to_string()));
    };

    let response: Response = JsFuture::from(promise)
        .await
        .map_err(transport_error)?
        .dyn_into()
        .map_err(transport_error)?;

    if response.status() != 200 {
        return Err(HighlightError::Status(response.status()));
    }

    let body = JsFuture::from(response.text().map_err(transport_error)?)
        .await
        .map_err(transport_error)?;
    body.as_string()
        .ok_or_else(|| HighlightError::Transport("response body is not text".to_string()))
}

fn transport_error(value: JsValue) -> HighlightError {
    HighlightError::Transport(
        value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value)),
    )
}

/// POST the document to the parser (JS binding). Resolves with the raw body.
#[wasm_bindgen(js_name = fetchVocabulary)]
pub async fn js_fetch_vocabulary(endpoint: String, text: String) -> std::result::Result<JsValue, JsValue> {
    fetch_vocabulary(&endpoint, &text)
        .await
        .map(|body| JsValue::from_str(&body))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
