use crate::{event::Input, mode::Mode};
use smol_str::SmolStr;
use std::{panic, sync::Arc};
use tracing::warn;

/// What happened during a dispatch cycle, as seen by subscribed listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// A handler chain consumed the event.
    Consumed,

    /// The current mode changed, either through a handler or through a forced
    /// [`set_mode`](crate::dispatch::Dispatcher::set_mode).
    Transition,

    /// A handler reported failure; the event was treated as unhandled.
    HandlerFailed { message: String },
}

/// Payload delivered to listeners after every mode transition and after every
/// consumed event. `old_mode` equals `new_mode` unless the cycle transitioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub old_mode: Mode,
    pub new_mode: Mode,
    pub input: Input,
    /// Label of the handler involved, when it had one.
    pub label: Option<SmolStr>,
    pub kind: NoticeKind,
}

/// Observers of dispatch outcomes, e.g. a status bar reflecting the current
/// mode. Listeners never influence dispatch.
pub type Listener = Arc<dyn Fn(&Notice) + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct ListenerSet {
    listeners: Vec<Listener>,
}

impl ListenerSet {
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Invoke every listener in registration order. A panicking listener is
    /// isolated and logged; the rest still run.
    pub fn notify(&self, notice: &Notice) {
        for listener in &self.listeners {
            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| listener(notice)));
            if result.is_err() {
                warn!(kind = ?notice.kind, "listener panicked during notification");
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
