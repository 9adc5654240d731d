//! Client-side wide-event telemetry for SketchTrace.
//!
//! Builds flat page-load and page-unload events from browser performance
//! data, intercepts application actions, and ships everything to the
//! relay without ever blocking or failing the page.

pub mod interceptor;
pub mod load;
pub mod tracker;
pub mod transport;
pub mod unload;

pub use interceptor::{ActionInterceptor, InvocationSite};
pub use load::build_page_load_event;
pub use tracker::Tracker;
pub use transport::{RelayTransport, TransportFailure};
pub use unload::build_page_unload_event;
