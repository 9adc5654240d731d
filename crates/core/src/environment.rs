//! Browser capability probing.
//!
//! The browser is an external collaborator: every performance API it
//! exposes may or may not exist in the running environment. Each API is
//! read through [`BrowserEnvironment`], which answers with a typed
//! `Option`, and [`EnvironmentSnapshot::probe`] collects all answers once so
//! the event builders work with plain optionals instead of re-checking
//! capabilities.
//!
//! The snapshot itself also implements [`BrowserEnvironment`], so a capture
//! serialized by the page (or written by hand in tests) can be replayed.

use serde::{Deserialize, Serialize};

/// Navigation timing milestones, in milliseconds.
///
/// Values are monotonically non-decreasing in lifecycle order. Milestones
/// the browser has not reached yet are reported as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub navigation_start: f64,
    #[serde(default)]
    pub unload_event_end: f64,
    #[serde(default)]
    pub domain_lookup_start: f64,
    #[serde(default)]
    pub domain_lookup_end: f64,
    #[serde(default)]
    pub connect_start: f64,
    #[serde(default)]
    pub connect_end: f64,
    #[serde(default)]
    pub request_start: f64,
    #[serde(default)]
    pub response_end: f64,
    #[serde(default)]
    pub dom_interactive: f64,
    #[serde(default)]
    pub dom_complete: f64,
    #[serde(default)]
    pub load_event_end: f64,
}

impl NavigationTiming {
    /// Offset of a milestone from navigation start.
    pub fn since_navigation_start(&self, milestone: f64) -> f64 {
        milestone - self.navigation_start
    }
}

/// A named paint-timing entry (`first-paint`, `first-contentful-paint`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintEntry {
    pub name: String,
    pub start_time: f64,
}

impl PaintEntry {
    pub fn new(name: impl Into<String>, start_time: f64) -> Self {
        Self {
            name: name.into(),
            start_time,
        }
    }
}

/// A resource-timing entry for one fetched asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Full URL of the resource.
    pub name: String,
    #[serde(default)]
    pub encoded_body_size: u64,
    #[serde(default)]
    pub decoded_body_size: u64,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub response_end: f64,
}

impl ResourceEntry {
    /// Last path segment of the resource URL, without query or fragment.
    pub fn file_name(&self) -> &str {
        let path = self
            .name
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Time from fetch start to the last response byte.
    pub fn duration_ms(&self) -> f64 {
        self.response_end - self.start_time
    }
}

/// A JS heap reading, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapSample {
    #[serde(rename = "usedJSHeapSize", alias = "usedJsHeapSize")]
    pub used_js_heap_size: u64,
    #[serde(rename = "totalJSHeapSize", alias = "totalJsHeapSize")]
    pub total_js_heap_size: u64,
}

/// The network-information descriptor (`navigator.connection`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInformation {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt: Option<f64>,
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Access to the browser APIs the wide events are built from.
///
/// Every method returns `None` when the API is unsupported in the current
/// environment. Implementations must not panic on missing capabilities.
pub trait BrowserEnvironment: Send + Sync {
    fn navigation_timing(&self) -> Option<NavigationTiming>;

    fn paint_entries(&self) -> Option<Vec<PaintEntry>>;

    fn resource_entries(&self) -> Option<Vec<ResourceEntry>>;

    fn heap_sample(&self) -> Option<HeapSample>;

    fn device_memory_gb(&self) -> Option<f64>;

    fn network_information(&self) -> Option<NetworkInformation>;

    fn viewport(&self) -> Option<Dimensions>;

    fn screen(&self) -> Option<Dimensions>;

    fn user_agent(&self) -> Option<String>;

    /// Wall-clock time in epoch milliseconds.
    fn now_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64
    }
}

/// The result of probing every capability once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timing: Option<NavigationTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint_entries: Option<Vec<PaintEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_entries: Option<Vec<ResourceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<HeapSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<NetworkInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// When the snapshot was taken (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at_ms: Option<f64>,
}

impl EnvironmentSnapshot {
    /// Read every capability from the environment.
    pub fn probe(env: &dyn BrowserEnvironment) -> Self {
        let snapshot = Self {
            navigation_timing: env.navigation_timing(),
            paint_entries: env.paint_entries(),
            resource_entries: env.resource_entries(),
            memory: env.heap_sample(),
            device_memory: env.device_memory_gb(),
            connection: env.network_information(),
            viewport: env.viewport(),
            screen: env.screen(),
            user_agent: env.user_agent(),
            captured_at_ms: Some(env.now_ms()),
        };
        tracing::trace!(
            navigation_timing = snapshot.navigation_timing.is_some(),
            paint = snapshot.paint_entries.is_some(),
            resources = snapshot.resource_entries.is_some(),
            memory = snapshot.memory.is_some(),
            connection = snapshot.connection.is_some(),
            "Probed browser capabilities"
        );
        snapshot
    }

    /// Capture time, falling back to the current clock.
    pub fn now_ms(&self) -> f64 {
        self.captured_at_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as f64)
    }
}

impl BrowserEnvironment for EnvironmentSnapshot {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.navigation_timing
    }

    fn paint_entries(&self) -> Option<Vec<PaintEntry>> {
        self.paint_entries.clone()
    }

    fn resource_entries(&self) -> Option<Vec<ResourceEntry>> {
        self.resource_entries.clone()
    }

    fn heap_sample(&self) -> Option<HeapSample> {
        self.memory
    }

    fn device_memory_gb(&self) -> Option<f64> {
        self.device_memory
    }

    fn network_information(&self) -> Option<NetworkInformation> {
        self.connection.clone()
    }

    fn viewport(&self) -> Option<Dimensions> {
        self.viewport
    }

    fn screen(&self) -> Option<Dimensions> {
        self.screen
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn now_ms(&self) -> f64 {
        EnvironmentSnapshot::now_ms(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_file_name_strips_path_and_query() {
        let entry = ResourceEntry {
            name: "https://draw.example.com/static/js/main.abc123.chunk.js?v=2#x".into(),
            encoded_body_size: 0,
            decoded_body_size: 0,
            start_time: 0.0,
            response_end: 0.0,
        };
        assert_eq!(entry.file_name(), "main.abc123.chunk.js");
    }

    #[test]
    fn resource_file_name_without_path() {
        let entry = ResourceEntry {
            name: "main.css".into(),
            encoded_body_size: 0,
            decoded_body_size: 0,
            start_time: 0.0,
            response_end: 0.0,
        };
        assert_eq!(entry.file_name(), "main.css");
    }

    #[test]
    fn snapshot_parses_browser_shaped_json() {
        let json = r#"{
            "navigationTiming": { "navigationStart": 1000, "domComplete": 1800 },
            "connection": { "type": "wifi", "effectiveType": "4g", "rtt": 50 },
            "memory": { "usedJSHeapSize": 10, "totalJSHeapSize": 20 },
            "userAgent": "Mozilla/5.0"
        }"#;
        let snapshot: EnvironmentSnapshot = serde_json::from_str(json).unwrap();
        let timing = snapshot.navigation_timing.unwrap();
        assert_eq!(timing.navigation_start, 1000.0);
        assert_eq!(timing.connect_start, 0.0);
        assert_eq!(
            snapshot.connection.unwrap().connection_type.as_deref(),
            Some("wifi")
        );
        assert!(snapshot.paint_entries.is_none());
    }

    #[test]
    fn probe_round_trips_through_snapshot_environment() {
        let original = EnvironmentSnapshot {
            device_memory: Some(8.0),
            viewport: Some(Dimensions {
                width: 1280,
                height: 720,
            }),
            captured_at_ms: Some(42.0),
            ..Default::default()
        };
        let probed = EnvironmentSnapshot::probe(&original);
        assert_eq!(probed, original);
    }
}
