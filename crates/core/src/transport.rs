//! The transport seam between event producers and the network.
//!
//! Producers never wait on delivery: [`Transport::submit`] hands the
//! payload off and returns. What happens afterwards (a background HTTP
//! request, an in-memory buffer for tests) is the implementation's
//! business, and failures stay on that side of the seam.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TransportError;

/// Reserved body key carrying the event's action-name label.
pub const ACTION_NAME_KEY: &str = "action_name";

/// A serialized event ready for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    action_name: String,
    body: Map<String, Value>,
}

impl EventPayload {
    /// Serialize `record` to a JSON object and merge the label into it.
    ///
    /// The label overwrites any field already using the reserved key.
    pub fn new<T>(action_name: &str, record: &T) -> Result<Self, TransportError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(record)
            .map_err(|e| TransportError::NotAnObject(e.to_string()))?;
        let mut body = match value {
            Value::Object(body) => body,
            other => {
                return Err(TransportError::NotAnObject(format!(
                    "expected an object, got {}",
                    json_kind(&other)
                )));
            }
        };
        body.insert(ACTION_NAME_KEY.into(), Value::String(action_name.into()));
        Ok(Self {
            action_name: action_name.into(),
            body,
        })
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }

    /// The JSON text sent over the wire.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.body.clone()).to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fire-and-forget delivery of event payloads.
pub trait Transport: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Hand off a payload without waiting for delivery.
    ///
    /// Must not block and must not report failures to the caller.
    fn submit(&self, payload: EventPayload);
}

/// Serialize a record, label it, and submit it.
///
/// A record that cannot be turned into a JSON object is logged and dropped;
/// the producer never sees the failure.
pub fn send_event<T>(transport: &dyn Transport, action_name: &str, record: &T)
where
    T: Serialize + ?Sized,
{
    match EventPayload::new(action_name, record) {
        Ok(payload) => transport.submit(payload),
        Err(e) => {
            tracing::warn!(
                action = action_name,
                transport = transport.name(),
                error = %e,
                "Dropping telemetry event"
            );
        }
    }
}

/// Collects payloads in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    payloads: Mutex<Vec<EventPayload>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, oldest first.
    pub fn payloads(&self) -> Vec<EventPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn submit(&self, payload: EventPayload) {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_merges_label_under_reserved_key() {
        let payload = EventPayload::new("page-load", &json!({ "a": 1 })).unwrap();
        assert_eq!(payload.action_name(), "page-load");
        assert_eq!(
            Value::Object(payload.into_body()),
            json!({ "a": 1, "action_name": "page-load" })
        );
    }

    #[test]
    fn label_overrides_colliding_field() {
        let payload = EventPayload::new("real", &json!({ "action_name": "fake" })).unwrap();
        assert_eq!(payload.body()[ACTION_NAME_KEY], json!("real"));
    }

    #[test]
    fn non_object_record_is_rejected() {
        let err = EventPayload::new("x", &json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn send_event_drops_unserializable_record() {
        let transport = MemoryTransport::new();
        send_event(&transport, "x", &42);
        assert!(transport.is_empty());

        send_event(&transport, "y", &json!({ "ok": true }));
        assert_eq!(transport.len(), 1);
    }

    #[test]
    fn wire_text_is_valid_json() {
        let payload = EventPayload::new("z", &json!({ "k": "v" })).unwrap();
        let parsed: Value = serde_json::from_str(&payload.to_json_string()).unwrap();
        assert_eq!(parsed["k"], json!("v"));
    }
}
