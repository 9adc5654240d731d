//! HTTP relay for SketchTrace events.
//!
//! Accepts a JSON object from the browser, stamps it with the caller's IP
//! and identity claims, and forwards it to the ingestion API. The write
//! key stays on the server; the browser only ever talks to the relay.
//!
//! Built on Axum.

pub mod forward;
pub mod identity;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use sketchtrace_config::AppConfig;
use sketchtrace_core::error::IngestError;

pub use forward::{Forwarder, IngestForwarder};
pub use identity::ClientContext;

/// Body field holding the resolved client address.
pub const CLIENT_IP_FIELD: &str = "client_ip";

/// Largest accepted event body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for the relay.
pub struct RelayState {
    pub forwarder: Arc<dyn Forwarder>,
}

pub type SharedState = Arc<RelayState>;

/// Build the relay router with the endpoint mounted at `path`.
pub fn build_router(path: &str, state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route(path, any(relay_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the relay HTTP server.
///
/// Fails before binding if the write key or dataset is missing.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = config.ingest.credentials()?;
    let forwarder = IngestForwarder::new(&credentials)?;
    let addr = config.relay.bind_addr();

    info!(
        addr = %addr,
        path = %config.relay.path,
        dataset = %credentials.dataset,
        "Relay starting"
    );

    let state = Arc::new(RelayState {
        forwarder: Arc::new(forwarder),
    });
    let app = build_router(&config.relay.path, state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Errors ---

/// Failures of a single relay request.
#[derive(Debug)]
pub enum RelayError {
    /// Anything other than POST.
    MethodNotAllowed(Method),
    /// Body missing, not JSON, or not a JSON object.
    InvalidBody(String),
    /// The ingestion API did not accept the event.
    Forward(IngestError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            Self::MethodNotAllowed(method) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                format!("Method {method} not allowed; use POST"),
            )
                .into_response(),
            Self::InvalidBody(reason) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("invalid event body: {reason}"),
                }),
            )
                .into_response(),
            Self::Forward(e) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn relay_handler(
    State(state): State<SharedState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    if method != Method::POST {
        warn!(method = %method, "Rejected non-POST relay request");
        return Err(RelayError::MethodNotAllowed(method));
    }

    let mut event = parse_event(&body)?;
    enrich(&mut event, &headers);

    let action = event
        .get(sketchtrace_core::transport::ACTION_NAME_KEY)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    state.forwarder.forward(event).await.map_err(|e| {
        warn!(action = %action, forwarder = state.forwarder.name(), error = %e, "Forward failed");
        RelayError::Forward(e)
    })?;

    info!(action = %action, "Event relayed");
    Ok("ok")
}

/// Parse a request body into a JSON object.
pub fn parse_event(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(event)) => Ok(event),
        Ok(_) => Err(RelayError::InvalidBody("expected a JSON object".into())),
        Err(e) => Err(RelayError::InvalidBody(e.to_string())),
    }
}

/// Add the client IP and identity fields to an event.
///
/// Server-derived values overwrite anything the client sent under the
/// same keys.
pub fn enrich(event: &mut Map<String, Value>, headers: &HeaderMap) {
    event.insert(
        CLIENT_IP_FIELD.into(),
        Value::String(identity::client_ip(headers)),
    );
    if let Some(ctx) = ClientContext::from_headers(headers) {
        event.extend(ctx.identity_fields());
    }
}
