use crate::{event::Input, mode::Mode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;

/// What a handler did with the event it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The event is fully handled; no further handlers run.
    Consumed,

    /// Not interested; the next handler in the chain gets the event, or the
    /// host toolkit's default behavior applies if none remain.
    Skip,

    /// Consumed, and the dispatcher moves to the given mode before returning.
    Transition(Mode),
}

/// Error type handlers use to report failure. A failing handler never aborts
/// the host application; the dispatcher recovers and reports the event as
/// unhandled.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A handler callable. `C` is the host context threaded through every
/// dispatch call; handlers are owned by the embedding application and shared
/// with the dispatcher.
pub type Action<C> = Arc<dyn Fn(&mut C, &Input) -> Result<Step, HandlerError> + Send + Sync>;

/// One registered handler: the callable plus its registration metadata.
///
/// Invocation goes through the callable reference; the label exists for
/// introspection, notifications, and failure reports only.
pub struct HandlerEntry<C> {
    pub action: Action<C>,
    /// Mode applied when this entry consumes the event without declaring its
    /// own transition.
    pub target: Option<Mode>,
    pub label: Option<SmolStr>,
    /// One-shot entries unbind themselves after their first invocation.
    pub(crate) once: bool,
}

impl<C> HandlerEntry<C> {
    pub fn new(
        action: impl Fn(&mut C, &Input) -> Result<Step, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            action: Arc::new(action),
            target: None,
            label: None,
            once: false,
        }
    }

    /// Convenience over [`HandlerEntry::new`] for handlers that cannot fail.
    pub fn simple(action: impl Fn(&mut C, &Input) -> Step + Send + Sync + 'static) -> Self {
        Self::new(move |ctx, input| Ok(action(ctx, input)))
    }

    pub fn with_target(mut self, target: Mode) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl<C> Clone for HandlerEntry<C> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            target: self.target,
            label: self.label.clone(),
            once: self.once,
        }
    }
}

impl<C> std::fmt::Debug for HandlerEntry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("action", &"..")
            .field("target", &self.target)
            .field("label", &self.label)
            .field("once", &self.once)
            .finish()
    }
}

/// How a multi-handler chain advances past each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum ChainPolicy {
    /// Stop at the first handler that consumes; `Skip` proceeds to the next.
    #[default]
    UntilConsumed,

    /// Every handler runs regardless of what earlier ones returned. The event
    /// counts as handled if any handler consumed it.
    RunAll,
}

/// The ordered handler chain registered under one `(mode, input)` pair.
#[derive(Debug)]
pub struct Binding<C> {
    pub chain: Vec<HandlerEntry<C>>,
    pub policy: ChainPolicy,
}

impl<C> Binding<C> {
    pub fn new(chain: Vec<HandlerEntry<C>>) -> Self {
        Self {
            chain,
            policy: ChainPolicy::default(),
        }
    }

    pub fn single(entry: HandlerEntry<C>) -> Self {
        Self::new(vec![entry])
    }

    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<C> Clone for Binding<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            policy: self.policy,
        }
    }
}

/// What an input resolves to within one mode's table.
#[derive(Debug)]
pub(crate) enum Slot<C> {
    /// Run this handler chain.
    Chain(Binding<C>),

    /// Enter a pending prefix whose continuation keys resolve in the given
    /// mode's table.
    Prefix(Mode),
}

impl<C> Clone for Slot<C> {
    fn clone(&self) -> Self {
        match self {
            Slot::Chain(binding) => Slot::Chain(binding.clone()),
            Slot::Prefix(submap) => Slot::Prefix(*submap),
        }
    }
}

/// Per-mode binding table: literal bindings in registration order, plus an
/// optional catch-all chain consulted when no literal binding matches.
#[derive(Debug)]
pub(crate) struct ModeTable<C> {
    pub bindings: IndexMap<Input, Slot<C>>,
    pub fallback: Option<Binding<C>>,
}

impl<C> ModeTable<C> {
    pub fn new() -> Self {
        Self {
            bindings: IndexMap::new(),
            fallback: None,
        }
    }
}

impl<C> Default for ModeTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
