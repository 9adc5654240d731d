//! Forwarding enriched events to the ingestion API.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sketchtrace_config::IngestCredentials;
use sketchtrace_core::error::IngestError;
use tracing::{debug, warn};

/// Header carrying the ingest write key.
pub const WRITE_KEY_HEADER: &str = "X-Honeycomb-Team";

/// Destination for relayed events.
#[async_trait]
pub trait Forwarder: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one event and wait for the ingestion API's answer.
    async fn forward(&self, event: Map<String, Value>) -> Result<(), IngestError>;
}

/// Sends events to `{api_url}/{dataset}` authenticated by the write key.
pub struct IngestForwarder {
    endpoint: String,
    write_key: String,
    client: reqwest::Client,
}

impl IngestForwarder {
    pub fn new(credentials: &IngestCredentials) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| IngestError::Network(e.to_string()))?;

        Ok(Self {
            endpoint: credentials.endpoint(),
            write_key: credentials.write_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Forwarder for IngestForwarder {
    fn name(&self) -> &str {
        "ingest"
    }

    async fn forward(&self, event: Map<String, Value>) -> Result<(), IngestError> {
        debug!(endpoint = %self.endpoint, fields = event.len(), "Forwarding event");

        let response = self
            .client
            .post(&self.endpoint)
            .header(WRITE_KEY_HEADER, &self.write_key)
            .header("Content-Type", "application/json")
            .json(&event)
            .send()
            .await
            .map_err(|e| IngestError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(IngestError::AuthenticationFailed(
                "ingest API rejected the write key".into(),
            ));
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ingest API error");
            return Err(IngestError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for IngestForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestForwarder")
            .field("endpoint", &self.endpoint)
            .field("write_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Bytes,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::json;
    use tokio::sync::mpsc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn credentials(api_url: String) -> IngestCredentials {
        IngestCredentials {
            api_url,
            dataset: "drawing-frontend".into(),
            write_key: "wk-test".into(),
        }
    }

    #[tokio::test]
    async fn forwards_to_dataset_with_write_key() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::new().route(
            "/1/events/{dataset}",
            post(move |Path(dataset): Path<String>, headers: HeaderMap, body: Bytes| {
                let tx = tx.clone();
                async move {
                    let key = headers
                        .get(WRITE_KEY_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let body: Value = serde_json::from_slice(&body).unwrap();
                    tx.send((dataset, key, body)).unwrap();
                    StatusCode::OK
                }
            }),
        );
        let base = serve(router).await;

        let forwarder = IngestForwarder::new(&credentials(format!("{base}/1/events"))).unwrap();
        let mut event = Map::new();
        event.insert("type".into(), json!("page-load"));
        forwarder.forward(event).await.unwrap();

        let (dataset, key, body) = rx.recv().await.unwrap();
        assert_eq!(dataset, "drawing-frontend");
        assert_eq!(key.as_deref(), Some("wk-test"));
        assert_eq!(body, json!({ "type": "page-load" }));
    }

    #[tokio::test]
    async fn rejected_write_key_is_authentication_failure() {
        let router = Router::new().route(
            "/1/events/{dataset}",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = serve(router).await;

        let forwarder = IngestForwarder::new(&credentials(format!("{base}/1/events"))).unwrap();
        let err = forwarder.forward(Map::new()).await.unwrap_err();
        assert!(matches!(err, IngestError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let router = Router::new().route(
            "/1/events/{dataset}",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
        );
        let base = serve(router).await;

        let forwarder = IngestForwarder::new(&credentials(format!("{base}/1/events"))).unwrap();
        match forwarder.forward(Map::new()).await {
            Err(IngestError::ApiError {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 503);
                assert_eq!(message, "try later");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn debug_hides_write_key() {
        let forwarder =
            IngestForwarder::new(&credentials("https://api.example.com/1/events".into())).unwrap();
        assert!(!format!("{forwarder:?}").contains("wk-test"));
        assert_eq!(forwarder.endpoint(), "https://api.example.com/1/events/drawing-frontend");
    }
}
