//! Action interception.
//!
//! Wraps an application action so every invocation emits an
//! [`ActionRecord`] before the action runs. The wrapper has the same call
//! shape as the action, returns its result untouched, and never lets the
//! transport's outcome leak back to the caller.

use std::sync::Arc;

use serde::Serialize;
use sketchtrace_core::event::ActionRecord;
use sketchtrace_core::transport::{Transport, send_event};
use tracing::debug;

/// Where an action invocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationSite {
    KeyboardShortcut,
    ContextMenu,
    FormPanel,
}

impl std::fmt::Display for InvocationSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyboardShortcut => write!(f, "keyboard_shortcut"),
            Self::ContextMenu => write!(f, "context_menu"),
            Self::FormPanel => write!(f, "form_panel"),
        }
    }
}

/// Emits one telemetry event per intercepted action call.
#[derive(Clone)]
pub struct ActionInterceptor {
    transport: Arc<dyn Transport>,
}

impl ActionInterceptor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build and submit the record for one call. Never blocks.
    pub fn record<S, D>(&self, action_name: &str, app_state: &S, form_data: Option<&D>)
    where
        S: Serialize + ?Sized,
        D: Serialize + ?Sized,
    {
        let record = ActionRecord::new(action_name, app_state, form_data);
        send_event(self.transport.as_ref(), &record.action_name, &record);
    }

    /// Wrap `op` so each call is recorded first and then delegated.
    ///
    /// The wrapper takes the same `(elements, app_state, form_data)`
    /// arguments as `op` and returns exactly what `op` returns. It owns a
    /// handle to the transport, so it outlives this interceptor.
    pub fn wrap<E, S, D, R, F>(
        &self,
        action_name: &str,
        op: F,
    ) -> impl Fn(E, &S, Option<&D>) -> R + Send + Sync + use<E, S, D, R, F>
    where
        F: Fn(E, &S, Option<&D>) -> R + Send + Sync + 'static,
        S: Serialize,
        D: Serialize,
    {
        let interceptor = self.clone();
        let action_name = action_name.to_string();
        move |elements: E, app_state: &S, form_data: Option<&D>| -> R {
            interceptor.record(&action_name, app_state, form_data);
            op(elements, app_state, form_data)
        }
    }

    /// Record and run an action resolved by one of the invocation sites.
    pub fn perform<E, S, D, R, F>(
        &self,
        site: InvocationSite,
        action_name: &str,
        op: F,
        elements: E,
        app_state: &S,
        form_data: Option<&D>,
    ) -> R
    where
        F: FnOnce(E, &S, Option<&D>) -> R,
        S: Serialize,
        D: Serialize,
    {
        debug!(action = action_name, site = %site, "Intercepted action");
        self.record(action_name, app_state, form_data);
        op(elements, app_state, form_data)
    }
}

impl std::fmt::Debug for ActionInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInterceptor")
            .field("transport", &self.transport.name())
            .finish()
    }
}
