//! Page lifecycle tracking.
//!
//! [`Tracker`] ties one session context to an environment and a
//! transport, and exposes the three lifecycle triggers: load, before-unload
//! and uncaught error.

use std::sync::Arc;

use sketchtrace_core::environment::{BrowserEnvironment, EnvironmentSnapshot};
use sketchtrace_core::event::{EventType, PageLoadEvent, PageUnloadEvent};
use sketchtrace_core::session::{ScriptError, SessionContext};
use sketchtrace_core::transport::{Transport, send_event};
use tracing::info;

use crate::interceptor::ActionInterceptor;
use crate::load::build_page_load_event;
use crate::unload::build_page_unload_event;

pub struct Tracker {
    session: Arc<SessionContext>,
    environment: Arc<dyn BrowserEnvironment>,
    transport: Arc<dyn Transport>,
}

impl Tracker {
    /// Start tracking. The heap baseline is sampled here, so create the
    /// tracker as early as possible.
    pub fn new(environment: Arc<dyn BrowserEnvironment>, transport: Arc<dyn Transport>) -> Self {
        let session = Arc::new(SessionContext::start(environment.as_ref()));
        Self::with_session(session, environment, transport)
    }

    pub fn with_session(
        session: Arc<SessionContext>,
        environment: Arc<dyn BrowserEnvironment>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            session,
            environment,
            transport,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Handle the window load signal.
    ///
    /// Yields once to the scheduler first so load handlers registered by
    /// the application finish before timing data is read. That ordering
    /// holds only when the handlers share one thread with this future: a
    /// current-thread runtime or a `LocalSet`. On a multi-thread runtime
    /// already-queued tasks may still be running when the probe happens.
    pub async fn on_load(&self) -> PageLoadEvent {
        tokio::task::yield_now().await;
        let snapshot = EnvironmentSnapshot::probe(self.environment.as_ref());
        let event = build_page_load_event(&snapshot, &self.session);
        info!(page_load_id = %event.page_load_id, "Page load recorded");
        send_event(self.transport.as_ref(), EventType::PageLoad.as_str(), &event);
        event
    }

    /// Handle the before-unload signal.
    ///
    /// Fires for navigation and refresh; closing the tab may skip it.
    pub fn on_before_unload(&self) -> PageUnloadEvent {
        let snapshot = EnvironmentSnapshot::probe(self.environment.as_ref());
        let event = build_page_unload_event(&snapshot, &self.session);
        info!(
            page_load_id = %event.page_load_id,
            errors = event.js_error_count,
            "Page unload recorded"
        );
        send_event(self.transport.as_ref(), EventType::PageUnload.as_str(), &event);
        event
    }

    /// Forward an uncaught script error to the session's hook chain.
    pub fn report_error(&self, error: &ScriptError) {
        self.session.report_error(error);
    }

    /// Interceptor sharing this tracker's transport.
    pub fn interceptor(&self) -> ActionInterceptor {
        ActionInterceptor::new(self.transport.clone())
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("session", &self.session)
            .field("transport", &self.transport.name())
            .finish()
    }
}
