//! Page-load wide event.
//!
//! Turns one [`EnvironmentSnapshot`] into a [`PageLoadEvent`]. Every
//! section is filled only from the capabilities the snapshot actually
//! has; nothing here fails when an API is missing.

use sketchtrace_core::environment::{EnvironmentSnapshot, NavigationTiming, PaintEntry, ResourceEntry};
use sketchtrace_core::event::{ClientContext, HeapMetrics, PageLoadEvent, ResourceMetrics, TimingMetrics};
use sketchtrace_core::session::SessionContext;

/// Paint entry name for the first paint.
pub const FIRST_PAINT: &str = "first-paint";
/// Paint entry name for the first contentful paint.
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Build the page-load event for this session.
pub fn build_page_load_event(
    snapshot: &EnvironmentSnapshot,
    session: &SessionContext,
) -> PageLoadEvent {
    let mut event = PageLoadEvent::new(session.correlation_id());

    event.client = client_context(snapshot);
    if let Some(timing) = &snapshot.navigation_timing {
        event.timing = navigation_metrics(timing);
    }
    if let Some(entries) = &snapshot.paint_entries {
        apply_paint_entries(&mut event.timing, entries);
    }
    if let Some(entries) = &snapshot.resource_entries {
        event.resources = resource_metrics(entries);
    }
    if let Some(heap) = snapshot.memory {
        event.heap = HeapMetrics {
            js_heap_size_total_b: Some(heap.total_js_heap_size),
            js_heap_size_used_b: Some(heap.used_js_heap_size),
        };
    }

    event
}

fn client_context(snapshot: &EnvironmentSnapshot) -> ClientContext {
    let connection = snapshot.connection.clone().unwrap_or_default();
    ClientContext {
        user_agent: snapshot.user_agent.clone(),
        window_width: snapshot.viewport.map(|d| d.width),
        window_height: snapshot.viewport.map(|d| d.height),
        screen_width: snapshot.screen.map(|d| d.width),
        screen_height: snapshot.screen.map(|d| d.height),
        device_memory_gb: snapshot.device_memory,
        connection_type: connection.connection_type,
        connection_type_effective: connection.effective_type,
        connection_rtt: connection.rtt,
    }
}

/// Offsets from navigation start plus interval durations.
///
/// Interval durations use only their own two endpoints, so they do not
/// move when an unrelated milestone changes. First paint defaults to the
/// DOM-complete offset until a real paint entry replaces it.
pub fn navigation_metrics(nt: &NavigationTiming) -> TimingMetrics {
    let since_start = |milestone| Some(nt.since_navigation_start(milestone));
    TimingMetrics {
        timing_unload_ms: since_start(nt.unload_event_end),
        timing_dns_end_ms: since_start(nt.domain_lookup_end),
        timing_ssl_end_ms: since_start(nt.connect_end),
        timing_response_end_ms: since_start(nt.response_end),
        timing_dom_interactive_ms: since_start(nt.dom_interactive),
        timing_dom_complete_ms: since_start(nt.dom_complete),
        timing_dom_loaded_ms: since_start(nt.load_event_end),
        timing_ms_first_paint: since_start(nt.dom_complete),
        timing_ms_first_contentful_paint: None,
        timing_dns_duration_ms: Some(nt.domain_lookup_end - nt.domain_lookup_start),
        timing_ssl_duration_ms: Some(nt.connect_end - nt.connect_start),
        timing_server_duration_ms: Some(nt.response_end - nt.request_start),
        timing_dom_loaded_duration_ms: Some(nt.load_event_end - nt.dom_complete),
    }
}

/// Overwrite paint fields with measured paint entries.
pub fn apply_paint_entries(timing: &mut TimingMetrics, entries: &[PaintEntry]) {
    for entry in entries {
        match entry.name.as_str() {
            FIRST_PAINT => timing.timing_ms_first_paint = Some(entry.start_time),
            FIRST_CONTENTFUL_PAINT => {
                timing.timing_ms_first_contentful_paint = Some(entry.start_time)
            }
            _ => {}
        }
    }
}

/// Main-bundle asset classes reported individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainChunk {
    Js,
    Css,
}

impl MainChunk {
    /// Classify a resource by file name: `main.*.chunk.js` or
    /// `main.*.chunk.css`.
    pub fn classify(entry: &ResourceEntry) -> Option<Self> {
        let file = entry.file_name();
        if !file.starts_with("main.") {
            return None;
        }
        if file.ends_with(".chunk.js") {
            Some(Self::Js)
        } else if file.ends_with(".chunk.css") {
            Some(Self::Css)
        } else {
            None
        }
    }
}

/// Count every resource and report size and duration of the main chunks.
///
/// If several resources match the same class, the last one in the list
/// wins. Matches are not aggregated: a single main bundle per class is
/// assumed.
pub fn resource_metrics(entries: &[ResourceEntry]) -> ResourceMetrics {
    let mut metrics = ResourceMetrics {
        resource_count: Some(entries.len()),
        ..ResourceMetrics::default()
    };

    for entry in entries {
        match MainChunk::classify(entry) {
            Some(MainChunk::Js) => {
                metrics.resource_main_chunk_js_encoded_size_kb = Some(entry.encoded_body_size);
                metrics.resource_main_chunk_js_decoded_size_kb = Some(entry.decoded_body_size);
                metrics.resource_main_chunk_js_timing_duration_ms = Some(entry.duration_ms());
            }
            Some(MainChunk::Css) => {
                metrics.resource_main_chunk_css_encoded_size_kb = Some(entry.encoded_body_size);
                metrics.resource_main_chunk_css_decoded_size_kb = Some(entry.decoded_body_size);
                metrics.resource_main_chunk_css_timing_duration_ms = Some(entry.duration_ms());
            }
            None => {}
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchtrace_core::environment::{Dimensions, HeapSample, NetworkInformation};
    use sketchtrace_core::session::CorrelationId;

    fn timing() -> NavigationTiming {
        NavigationTiming {
            navigation_start: 1_000.0,
            unload_event_end: 1_005.0,
            domain_lookup_start: 1_010.0,
            domain_lookup_end: 1_030.0,
            connect_start: 1_030.0,
            connect_end: 1_080.0,
            request_start: 1_090.0,
            response_end: 1_200.0,
            dom_interactive: 1_400.0,
            dom_complete: 1_700.0,
            load_event_end: 1_750.0,
        }
    }

    fn resource(name: &str, encoded: u64, decoded: u64, start: f64, end: f64) -> ResourceEntry {
        ResourceEntry {
            name: name.into(),
            encoded_body_size: encoded,
            decoded_body_size: decoded,
            start_time: start,
            response_end: end,
        }
    }

    fn session() -> SessionContext {
        SessionContext::with_correlation_id(CorrelationId::from_raw(4242), None)
    }

    #[test]
    fn full_snapshot_produces_every_section() {
        let snapshot = EnvironmentSnapshot {
            navigation_timing: Some(timing()),
            paint_entries: Some(vec![PaintEntry::new(FIRST_CONTENTFUL_PAINT, 310.0)]),
            resource_entries: Some(vec![resource(
                "https://x/static/js/main.1.chunk.js",
                1,
                2,
                0.0,
                5.0,
            )]),
            memory: Some(HeapSample {
                used_js_heap_size: 10,
                total_js_heap_size: 20,
            }),
            device_memory: Some(4.0),
            connection: Some(NetworkInformation {
                connection_type: Some("wifi".into()),
                effective_type: Some("4g".into()),
                rtt: Some(100.0),
            }),
            viewport: Some(Dimensions {
                width: 800,
                height: 600,
            }),
            screen: Some(Dimensions {
                width: 1920,
                height: 1080,
            }),
            user_agent: Some("Mozilla/5.0".into()),
            captured_at_ms: Some(2_000.0),
        };

        let event = build_page_load_event(&snapshot, &session());
        assert_eq!(event.page_load_id.value(), 4242);
        assert_eq!(event.client.window_width, Some(800));
        assert_eq!(event.client.screen_height, Some(1080));
        assert_eq!(event.client.connection_type_effective.as_deref(), Some("4g"));
        assert_eq!(event.timing.timing_dom_complete_ms, Some(700.0));
        assert_eq!(event.timing.timing_ms_first_contentful_paint, Some(310.0));
        assert_eq!(event.timing.timing_server_duration_ms, Some(110.0));
        assert_eq!(event.timing.timing_dom_loaded_duration_ms, Some(50.0));
        assert_eq!(event.resources.resource_count, Some(1));
        assert_eq!(event.heap.js_heap_size_used_b, Some(10));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "page-load");
        assert_eq!(json["page_load_id"], 4242);
        assert_eq!(json["user_agent"], "Mozilla/5.0");
    }

    #[test]
    fn empty_snapshot_yields_only_required_fields() {
        let event = build_page_load_event(&EnvironmentSnapshot::default(), &session());
        let json = serde_json::to_value(&event).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.values().all(|v| !v.is_null()));
    }

    #[test]
    fn missing_capabilities_never_produce_null() {
        let snapshot = EnvironmentSnapshot {
            navigation_timing: Some(timing()),
            connection: Some(NetworkInformation {
                connection_type: None,
                effective_type: Some("3g".into()),
                rtt: None,
            }),
            ..Default::default()
        };
        let event = build_page_load_event(&snapshot, &session());
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("null"));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(json.get("connection_type").is_none());
        assert_eq!(json["connection_type_effective"], "3g");
    }

    #[test]
    fn durations_depend_only_on_their_endpoints() {
        let a = navigation_metrics(&timing());
        let b = navigation_metrics(&NavigationTiming {
            connect_start: 1_060.0,
            ..timing()
        });

        assert_eq!(a.timing_ssl_duration_ms, Some(50.0));
        assert_eq!(b.timing_ssl_duration_ms, Some(20.0));
        assert_eq!(a.timing_dns_duration_ms, Some(20.0));
        assert_eq!(a.timing_dns_duration_ms, b.timing_dns_duration_ms);
    }

    #[test]
    fn offsets_use_navigation_start_as_epoch() {
        let metrics = navigation_metrics(&timing());
        assert_eq!(metrics.timing_unload_ms, Some(5.0));
        assert_eq!(metrics.timing_dns_end_ms, Some(30.0));
        assert_eq!(metrics.timing_ssl_end_ms, Some(80.0));
        assert_eq!(metrics.timing_response_end_ms, Some(200.0));
        assert_eq!(metrics.timing_dom_interactive_ms, Some(400.0));
        assert_eq!(metrics.timing_dom_loaded_ms, Some(750.0));
    }

    #[test]
    fn first_paint_falls_back_to_dom_complete() {
        let snapshot = EnvironmentSnapshot {
            navigation_timing: Some(timing()),
            ..Default::default()
        };
        let event = build_page_load_event(&snapshot, &session());
        assert_eq!(event.timing.timing_ms_first_paint, Some(700.0));
        assert_eq!(event.timing.timing_ms_first_contentful_paint, None);
    }

    #[test]
    fn measured_first_paint_overrides_fallback() {
        let snapshot = EnvironmentSnapshot {
            navigation_timing: Some(timing()),
            paint_entries: Some(vec![
                PaintEntry::new(FIRST_PAINT, 120.0),
                PaintEntry::new("something-else", 999.0),
            ]),
            ..Default::default()
        };
        let event = build_page_load_event(&snapshot, &session());
        assert_eq!(event.timing.timing_ms_first_paint, Some(120.0));
    }

    #[test]
    fn paint_entries_without_navigation_timing() {
        let snapshot = EnvironmentSnapshot {
            paint_entries: Some(vec![PaintEntry::new(FIRST_PAINT, 88.0)]),
            ..Default::default()
        };
        let event = build_page_load_event(&snapshot, &session());
        assert_eq!(event.timing.timing_ms_first_paint, Some(88.0));
        assert_eq!(event.timing.timing_dns_duration_ms, None);
    }

    #[test]
    fn empty_paint_list_keeps_fallback() {
        let mut metrics = navigation_metrics(&timing());
        apply_paint_entries(&mut metrics, &[]);
        assert_eq!(metrics.timing_ms_first_paint, Some(700.0));
    }

    #[test]
    fn main_js_chunk_is_reported() {
        let metrics = resource_metrics(&[
            resource("https://draw.example.com/static/js/main.abc123.chunk.js", 500, 1200, 10.0, 45.0),
            resource("https://draw.example.com/static/js/vendor.chunk.js", 9, 9, 0.0, 1.0),
        ]);
        assert_eq!(metrics.resource_count, Some(2));
        assert_eq!(metrics.resource_main_chunk_js_encoded_size_kb, Some(500));
        assert_eq!(metrics.resource_main_chunk_js_decoded_size_kb, Some(1200));
        assert_eq!(metrics.resource_main_chunk_js_timing_duration_ms, Some(35.0));
        assert_eq!(metrics.resource_main_chunk_css_encoded_size_kb, None);
    }

    #[test]
    fn non_main_chunks_only_count() {
        let metrics = resource_metrics(&[
            resource("https://x/vendor.chunk.js", 1, 1, 0.0, 1.0),
            resource("https://x/main.js", 1, 1, 0.0, 1.0),
            resource("https://x/static/main/app.chunk.js", 1, 1, 0.0, 1.0),
        ]);
        assert_eq!(metrics.resource_count, Some(3));
        assert_eq!(
            metrics,
            ResourceMetrics {
                resource_count: Some(3),
                ..ResourceMetrics::default()
            }
        );
    }

    #[test]
    fn css_chunk_and_last_match_wins() {
        let metrics = resource_metrics(&[
            resource("https://x/static/css/main.a.chunk.css", 100, 300, 5.0, 15.0),
            resource("https://x/static/css/main.b.chunk.css", 200, 600, 20.0, 60.0),
        ]);
        assert_eq!(metrics.resource_main_chunk_css_encoded_size_kb, Some(200));
        assert_eq!(metrics.resource_main_chunk_css_decoded_size_kb, Some(600));
        assert_eq!(metrics.resource_main_chunk_css_timing_duration_ms, Some(40.0));
    }

    #[test]
    fn empty_resource_list_reports_zero_count() {
        let metrics = resource_metrics(&[]);
        assert_eq!(metrics.resource_count, Some(0));
    }
}
