//! `sketchtrace send`: build a wide event from a captured snapshot.
//!
//! The snapshot is the JSON form of an environment probe, as captured in a
//! browser. Useful for checking a relay deployment end to end.

use std::path::Path;
use std::time::Duration;

use sketchtrace_config::AppConfig;
use sketchtrace_core::environment::EnvironmentSnapshot;
use sketchtrace_core::event::EventType;
use sketchtrace_core::session::SessionContext;
use sketchtrace_core::transport::EventPayload;
use sketchtrace_telemetry::{RelayTransport, build_page_load_event, build_page_unload_event};

use crate::EventKind;

pub async fn run(
    snapshot_path: &Path,
    kind: EventKind,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let raw = std::fs::read_to_string(snapshot_path)
        .map_err(|e| format!("Failed to read {}: {e}", snapshot_path.display()))?;
    let payload = build_payload(&raw, kind)?;

    println!("{}", serde_json::to_string_pretty(payload.body())?);

    if dry_run {
        return Ok(());
    }

    let transport = RelayTransport::with_timeout(&config.client.relay_url, Duration::from_secs(10))?;
    transport.deliver(&payload).await?;
    println!("\nSent {} to {}", payload.action_name(), transport.relay_url());

    Ok(())
}

/// Parse a snapshot and build the requested lifecycle event.
///
/// The snapshot doubles as the session's baseline, so an unload event
/// built this way reports a zero heap change.
fn build_payload(
    snapshot_json: &str,
    kind: EventKind,
) -> Result<EventPayload, Box<dyn std::error::Error>> {
    let snapshot: EnvironmentSnapshot =
        serde_json::from_str(snapshot_json).map_err(|e| format!("Invalid snapshot: {e}"))?;
    let session = SessionContext::start(&snapshot);

    let payload = match kind {
        EventKind::Load => EventPayload::new(
            EventType::PageLoad.as_str(),
            &build_page_load_event(&snapshot, &session),
        )?,
        EventKind::Unload => EventPayload::new(
            EventType::PageUnload.as_str(),
            &build_page_unload_event(&snapshot, &session),
        )?,
    };
    Ok(payload)
}
