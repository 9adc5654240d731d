//! Per-page session context shared by the load and unload builders.
//!
//! One [`SessionContext`] is created when tracking starts and lives until
//! the page is torn down. It owns the only state that crosses event
//! boundaries: the correlation id, the baseline heap sample, and the
//! uncaught-error tally together with the error-hook chain.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::environment::{BrowserEnvironment, HeapSample};

/// Identifier joining the load and unload events of one page lifecycle.
///
/// Drawn uniformly from `0..100_000_000`. Collisions across sessions are
/// possible; it is not a security token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u32);

impl CorrelationId {
    /// Exclusive upper bound of the id range.
    pub const UPPER_BOUND: u32 = 100_000_000;

    /// Draw a fresh id.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        Self(rng.random_range(0..Self::UPPER_BOUND))
    }

    pub fn from_raw(value: u32) -> Self {
        Self(value % Self::UPPER_BOUND)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An uncaught script error observed by the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// A callback invoked for every reported script error.
pub type ErrorHook = Arc<dyn Fn(&ScriptError) + Send + Sync>;

/// Session-scoped telemetry state.
pub struct SessionContext {
    correlation_id: CorrelationId,
    baseline_heap: Option<HeapSample>,
    error_count: AtomicU64,
    /// Invoked in registration order before the tally is incremented.
    error_hooks: RwLock<Vec<ErrorHook>>,
}

impl SessionContext {
    /// Create a context with a fresh correlation id.
    pub fn new(baseline_heap: Option<HeapSample>) -> Self {
        Self::with_correlation_id(CorrelationId::generate(), baseline_heap)
    }

    pub fn with_correlation_id(
        correlation_id: CorrelationId,
        baseline_heap: Option<HeapSample>,
    ) -> Self {
        Self {
            correlation_id,
            baseline_heap,
            error_count: AtomicU64::new(0),
            error_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Start a session, sampling the heap baseline immediately.
    pub fn start(env: &dyn BrowserEnvironment) -> Self {
        let ctx = Self::new(env.heap_sample());
        tracing::debug!(
            page_load_id = %ctx.correlation_id,
            baseline_heap = ctx.baseline_heap.is_some(),
            "Telemetry session started"
        );
        ctx
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn baseline_heap(&self) -> Option<HeapSample> {
        self.baseline_heap
    }

    /// Number of script errors reported so far.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Append a hook to the error chain. Hooks registered earlier run first.
    ///
    /// A hook registered while an error is being reported first runs for
    /// the next error.
    pub fn register_error_hook<F>(&self, hook: F)
    where
        F: Fn(&ScriptError) + Send + Sync + 'static,
    {
        let mut hooks = self
            .error_hooks
            .write()
            .unwrap_or_else(|e| e.into_inner());
        hooks.push(Arc::new(hook));
    }

    /// Report an uncaught script error.
    ///
    /// Every registered hook sees the error, then the tally goes up by one.
    /// The error is never swallowed by the tally. Hooks run on a snapshot
    /// of the chain with no lock held, so a hook may itself report errors
    /// or register hooks.
    pub fn report_error(&self, error: &ScriptError) {
        let hooks: Vec<ErrorHook> = self
            .error_hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for hook in &hooks {
            hook(error);
        }
        let count = self.error_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(count, message = %error.message, "Script error counted");
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hook_count = self
            .error_hooks
            .read()
            .map(|hooks| hooks.len())
            .unwrap_or_default();
        f.debug_struct("SessionContext")
            .field("correlation_id", &self.correlation_id)
            .field("baseline_heap", &self.baseline_heap)
            .field("error_count", &self.error_count())
            .field("error_hooks", &hook_count)
            .finish()
    }
}
