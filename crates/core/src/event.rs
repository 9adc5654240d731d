//! Wide-event records.
//!
//! Each event kind is a typed struct that serializes to one flat JSON
//! object. Optional fields are skipped when absent, so a missing browser
//! capability shows up as a missing key, never as `null`. Nested sections
//! use `#[serde(flatten)]` to keep the wire shape flat.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::CorrelationId;

/// Discriminator written to the `type` field of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    PageLoad,
    PageUnload,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageLoad => "page-load",
            Self::PageUnload => "page-unload",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Page load ─────────────────────────────────────────────────────────────

/// Browser, window and network context of the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_memory_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type_effective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_rtt: Option<f64>,
}

/// Durations derived from navigation and paint timing, in milliseconds.
///
/// `*_ms` offsets are measured from navigation start; `*_duration_ms`
/// values are the distance between their own two endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_unload_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dns_end_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ssl_end_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_response_end_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dom_interactive_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dom_complete_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dom_loaded_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms_first_paint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms_first_contentful_paint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dns_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ssl_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_server_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_dom_loaded_duration_ms: Option<f64>,
}

/// Resource-timing summary with per-asset fields for the main bundle.
///
/// The `_kb` suffix is historical: the values are the raw body sizes the
/// browser reports, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_js_encoded_size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_js_decoded_size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_js_timing_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_css_encoded_size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_css_decoded_size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_main_chunk_css_timing_duration_ms: Option<f64>,
}

/// Current JS heap reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_size_total_b: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_size_used_b: Option<u64>,
}

/// Wide event describing a completed page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLoadEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub page_load_id: CorrelationId,
    #[serde(flatten)]
    pub client: ClientContext,
    #[serde(flatten)]
    pub timing: TimingMetrics,
    #[serde(flatten)]
    pub resources: ResourceMetrics,
    #[serde(flatten)]
    pub heap: HeapMetrics,
}

impl PageLoadEvent {
    pub fn new(page_load_id: CorrelationId) -> Self {
        Self {
            event_type: EventType::PageLoad,
            page_load_id,
            client: ClientContext::default(),
            timing: TimingMetrics::default(),
            resources: ResourceMetrics::default(),
            heap: HeapMetrics::default(),
        }
    }
}

// ── Page unload ───────────────────────────────────────────────────────────

/// Wide event describing the end of a page's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUnloadEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub page_load_id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_on_page_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_size_used_start_b: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_size_total_b: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_size_used_b: Option<u64>,
    /// Signed: negative when the heap shrank during the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_heap_change_b: Option<i64>,
    pub js_error_count: u64,
}

impl PageUnloadEvent {
    pub fn new(page_load_id: CorrelationId, js_error_count: u64) -> Self {
        Self {
            event_type: EventType::PageUnload,
            page_load_id,
            time_on_page_sec: None,
            js_heap_size_used_start_b: None,
            js_heap_size_total_b: None,
            js_heap_size_used_b: None,
            js_heap_change_b: None,
            js_error_count,
        }
    }
}

// ── Action ────────────────────────────────────────────────────────────────

/// Key prefix applied to every field of a flattened app-state snapshot.
pub const APP_STATE_PREFIX: &str = "appState_";

/// Telemetry for one intercepted application action.
///
/// The action name is not part of the body; it travels as the transport
/// label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    #[serde(skip)]
    pub action_name: String,
    #[serde(flatten)]
    pub app_state: Map<String, Value>,
    #[serde(rename = "formData", skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
}

impl ActionRecord {
    /// Build a record from the action's invocation arguments.
    ///
    /// Top-level fields of `app_state` are re-keyed with [`APP_STATE_PREFIX`];
    /// nested values are kept as they are. `form_data` is carried verbatim.
    /// Arguments that fail to serialize are dropped with a warning.
    pub fn new<S, D>(action_name: impl Into<String>, app_state: &S, form_data: Option<&D>) -> Self
    where
        S: Serialize + ?Sized,
        D: Serialize + ?Sized,
    {
        let action_name = action_name.into();
        let app_state = match serde_json::to_value(app_state) {
            Ok(value) => flatten_app_state(value),
            Err(e) => {
                tracing::warn!(action = %action_name, error = %e, "App state not serializable");
                Map::new()
            }
        };
        let form_data = form_data.and_then(|data| match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(action = %action_name, error = %e, "Form data not serializable");
                None
            }
        });
        Self {
            action_name,
            app_state,
            form_data,
        }
    }
}

/// Prefix the top-level keys of a JSON object. Nulls are omitted and
/// non-object snapshots contribute nothing.
pub fn flatten_app_state(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (format!("{APP_STATE_PREFIX}{k}"), v))
            .collect(),
        _ => Map::new(),
    }
}
