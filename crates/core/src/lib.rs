//! # SketchTrace Core
//!
//! Domain types, traits, and error definitions for SketchTrace frontend
//! telemetry. This crate has **no HTTP or runtime dependencies**: it defines
//! the wide-event model and the seams that the telemetry and relay crates
//! implement against.
//!
//! ## Seams
//!
//! - [`BrowserEnvironment`]: where performance data comes from
//! - [`Transport`]: where finished events go
//!
//! Both are traits so the builders can be tested with captured snapshots
//! and an in-memory transport.

pub mod environment;
pub mod error;
pub mod event;
pub mod session;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use environment::{
    BrowserEnvironment, Dimensions, EnvironmentSnapshot, HeapSample, NavigationTiming,
    NetworkInformation, PaintEntry, ResourceEntry,
};
pub use error::{Error, IngestError, Result, TransportError};
pub use event::{ActionRecord, EventType, PageLoadEvent, PageUnloadEvent};
pub use session::{CorrelationId, ErrorHook, ScriptError, SessionContext};
pub use transport::{EventPayload, MemoryTransport, Transport, send_event};
