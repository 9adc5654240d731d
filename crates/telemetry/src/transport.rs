//! HTTP transport from the client to the relay.
//!
//! `submit` spawns the POST on the ambient tokio runtime and returns
//! immediately. Delivery failures are logged and, when a failure channel
//! is attached, published on it. They are never retried and never reach
//! the producer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sketchtrace_core::error::TransportError;
use sketchtrace_core::transport::{EventPayload, Transport};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A delivery that did not succeed.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub action_name: String,
    pub error: TransportError,
    pub failed_at: DateTime<Utc>,
}

/// POSTs event payloads as JSON to the relay endpoint.
pub struct RelayTransport {
    relay_url: String,
    client: reqwest::Client,
    failures: Option<mpsc::UnboundedSender<TransportFailure>>,
}

impl RelayTransport {
    /// Create a transport for the given relay URL.
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self::with_client(relay_url, reqwest::Client::new())
    }

    /// Create a transport with a request timeout.
    pub fn with_timeout(
        relay_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self::with_client(relay_url, client))
    }

    pub fn with_client(relay_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            relay_url: relay_url.into(),
            client,
            failures: None,
        }
    }

    /// Publish delivery failures on a channel in addition to logging them.
    ///
    /// Returns the receiving half. Dropping it is fine: failures are then
    /// only logged.
    pub fn with_failure_channel(mut self) -> (Self, mpsc::UnboundedReceiver<TransportFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.failures = Some(tx);
        (self, rx)
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Send one payload and wait for the relay's answer.
    ///
    /// This is the awaited half of `submit`; producers should go through
    /// [`Transport::submit`] instead.
    pub async fn deliver(&self, payload: &EventPayload) -> Result<(), TransportError> {
        post_payload(&self.client, &self.relay_url, payload).await
    }
}

async fn post_payload(
    client: &reqwest::Client,
    relay_url: &str,
    payload: &EventPayload,
) -> Result<(), TransportError> {
    let response = client
        .post(relay_url)
        .header("Content-Type", "application/json")
        .body(payload.to_json_string())
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(TransportError::Rejected {
            status_code: status.as_u16(),
            message,
        });
    }

    Ok(())
}

fn report_failure(
    failures: Option<&mpsc::UnboundedSender<TransportFailure>>,
    action_name: &str,
    error: TransportError,
) {
    warn!(action = action_name, error = %error, "Telemetry event not delivered");
    if let Some(tx) = failures {
        // A closed receiver only means nobody is listening anymore.
        let _ = tx.send(TransportFailure {
            action_name: action_name.to_string(),
            error,
            failed_at: Utc::now(),
        });
    }
}

impl Transport for RelayTransport {
    fn name(&self) -> &str {
        "relay"
    }

    fn submit(&self, payload: EventPayload) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            report_failure(
                self.failures.as_ref(),
                payload.action_name(),
                TransportError::NoRuntime,
            );
            return;
        };

        let client = self.client.clone();
        let relay_url = self.relay_url.clone();
        let failures = self.failures.clone();

        handle.spawn(async move {
            match post_payload(&client, &relay_url, &payload).await {
                Ok(()) => debug!(action = payload.action_name(), "Telemetry event delivered"),
                Err(e) => report_failure(failures.as_ref(), payload.action_name(), e),
            }
        });
    }
}

impl std::fmt::Debug for RelayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayTransport")
            .field("relay_url", &self.relay_url)
            .field("failure_channel", &self.failures.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Bytes, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn payload() -> EventPayload {
        EventPayload::new("page-load", &json!({ "type": "page-load" })).unwrap()
    }

    #[tokio::test]
    async fn submit_posts_json_body() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let router = Router::new().route(
            "/relay",
            post(move |body: Bytes| {
                let tx = tx.clone();
                async move {
                    tx.send(serde_json::from_slice(&body).unwrap()).unwrap();
                    "ok"
                }
            }),
        );
        let base = serve(router).await;

        let transport = RelayTransport::new(format!("{base}/relay"));
        transport.submit(payload());

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, json!({ "type": "page-load", "action_name": "page-load" }));
    }

    #[tokio::test]
    async fn rejected_delivery_is_published_on_failure_channel() {
        let router = Router::new().route(
            "/relay",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = serve(router).await;

        let (transport, mut failures) =
            RelayTransport::new(format!("{base}/relay")).with_failure_channel();
        transport.submit(payload());

        let failure = tokio::time::timeout(Duration::from_secs(5), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.action_name, "page-load");
        assert!(matches!(
            failure.error,
            TransportError::Rejected { status_code: 502, .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_relay_does_not_reach_the_caller() {
        // Port 9 (discard) on loopback is closed on test machines.
        let (transport, mut failures) =
            RelayTransport::new("http://127.0.0.1:9/relay").with_failure_channel();
        transport.submit(payload());

        let failure = tokio::time::timeout(Duration::from_secs(10), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(failure.error, TransportError::Network(_)));
    }

    #[test]
    fn submit_outside_runtime_is_dropped() {
        let (transport, mut failures) =
            RelayTransport::new("http://127.0.0.1:9/relay").with_failure_channel();
        transport.submit(payload());

        let failure = failures.try_recv().unwrap();
        assert!(matches!(failure.error, TransportError::NoRuntime));
    }

    #[tokio::test]
    async fn deliver_reports_success() {
        let router = Router::new().route("/relay", post(|| async { "ok" }));
        let base = serve(router).await;

        let transport = RelayTransport::new(format!("{base}/relay"));
        assert!(transport.deliver(&payload()).await.is_ok());
    }
}
