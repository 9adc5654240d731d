//! Page-unload wide event.
//!
//! Built from the `beforeunload` signal. That signal fires dependably for
//! navigation and refresh but not for closing the tab or browser, so some
//! sessions end without an unload event.

use sketchtrace_core::environment::EnvironmentSnapshot;
use sketchtrace_core::event::PageUnloadEvent;
use sketchtrace_core::session::SessionContext;

/// Build the unload event from the current snapshot and session state.
pub fn build_page_unload_event(
    snapshot: &EnvironmentSnapshot,
    session: &SessionContext,
) -> PageUnloadEvent {
    let mut event = PageUnloadEvent::new(session.correlation_id(), session.error_count());

    if let Some(timing) = &snapshot.navigation_timing {
        event.time_on_page_sec = Some((snapshot.now_ms() - timing.connect_start) / 1000.0);
    }

    if let Some(current) = snapshot.memory {
        event.js_heap_size_total_b = Some(current.total_js_heap_size);
        event.js_heap_size_used_b = Some(current.used_js_heap_size);
        if let Some(baseline) = session.baseline_heap() {
            event.js_heap_size_used_start_b = Some(baseline.used_js_heap_size);
            event.js_heap_change_b =
                Some(current.used_js_heap_size as i64 - baseline.used_js_heap_size as i64);
        }
    }

    event
}
