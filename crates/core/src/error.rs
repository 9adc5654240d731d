//! Error types for the SketchTrace domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for SketchTrace operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Ingestion errors ---
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures sending a wide event from the client to the relay.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Relay request failed: {0}")]
    Network(String),

    #[error("Relay rejected event: {message} (status: {status_code})")]
    Rejected { status_code: u16, message: String },

    #[error("Event is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("No async runtime available to submit event")]
    NoRuntime,
}

/// Failures forwarding an event from the relay to the ingestion API.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("Ingest API request failed: {0}")]
    Network(String),

    #[error("Ingest API error: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Ingest authentication failed: {0}")]
    AuthenticationFailed(String),
}
