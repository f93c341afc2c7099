use crate::{
    binding::{Binding, ChainPolicy, HandlerEntry, ModeTable, Slot, Step},
    error::{Error, Result},
    event::Input,
    key::Chord,
    mode::{Mode, ModeRegistry},
    observe::{Listener, ListenerSet, Notice, NoticeKind},
    prefix::PrefixState,
};
use indexmap::map::Entry;
use smol_str::SmolStr;
use tracing::{debug, trace, warn};

/// Result of one dispatch cycle, consumed by the host event loop to decide
/// whether its default behavior should still apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Unhandled,
}

impl Outcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }
}

/// Synthetic input name listeners observe on a forced
/// [`Dispatcher::set_mode`] transition.
pub const FORCED_INPUT: &str = "forced";

/// Default number of idle ticks before a pending prefix resets.
/// About half a second at a 60 ticks/s host loop.
const DEFAULT_PREFIX_TIMEOUT: u32 = 30;

/// Where a resolved chain lives, so one-shot entries can be unbound after
/// they run. `input: None` addresses a mode's fallback chain.
#[derive(Debug, Clone)]
struct BindingRef {
    mode: Mode,
    input: Option<Input>,
}

/// One row of [`Dispatcher::bindings`] output.
#[derive(Debug)]
pub enum BindingInfo<'a, C> {
    Chain(&'a Binding<C>),
    Prefix(Mode),
}

/// The mode-and-map event dispatcher.
///
/// One dispatcher owns one current mode, the binding tables of every declared
/// mode, the pending prefix state, and the listener list. Hosts construct it
/// once, register bindings at setup time, and then feed it events from their
/// loop:
///
/// ```
/// use marten_core::{Chord, Dispatcher, HandlerEntry, Input, Key, Outcome, Step};
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher
///     .bind(
///         marten_core::Mode::GLOBAL,
///         Chord::ctrl(Key::Char('j')),
///         HandlerEntry::simple(|lines: &mut Vec<String>, _| {
///             lines.push("eval".into());
///             Step::Consumed
///         }),
///     )
///     .expect("global mode always exists");
///
/// let mut lines = Vec::new();
/// let outcome = dispatcher.dispatch(&mut lines, &Input::Key(Chord::ctrl(Key::Char('j'))));
/// assert_eq!(outcome, Outcome::Handled);
/// assert_eq!(lines, vec!["eval".to_string()]);
/// ```
pub struct Dispatcher<C> {
    registry: ModeRegistry,
    /// One table per declared mode, indexed by the mode id.
    tables: Vec<ModeTable<C>>,
    current: Mode,
    previous: Mode,
    prefix: Option<PrefixState>,
    prefix_timeout: u32,
    escape: Chord,
    listeners: ListenerSet,
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self {
            registry: ModeRegistry::new(),
            tables: vec![ModeTable::new()],
            current: Mode::GLOBAL,
            previous: Mode::GLOBAL,
            prefix: None,
            prefix_timeout: DEFAULT_PREFIX_TIMEOUT,
            escape: Chord::esc(),
            listeners: ListenerSet::default(),
        }
    }

    /// Declare a dispatch mode. Idempotent per name; the returned id is only
    /// meaningful to this dispatcher.
    pub fn declare_mode(&mut self, name: impl Into<SmolStr>) -> Mode {
        let mode = self.registry.declare(name);
        while self.tables.len() < self.registry.len() {
            self.tables.push(ModeTable::new());
        }
        mode
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    /// The currently active mode.
    pub fn mode(&self) -> Mode {
        self.current
    }

    pub fn previous_mode(&self) -> Mode {
        self.previous
    }

    pub fn mode_name(&self) -> &str {
        self.registry.name(self.current).unwrap_or("?")
    }

    /// Keys accumulated by a pending prefix sequence, oldest first. Empty
    /// when no prefix is pending. Status bars render this as e.g. `C-x-`.
    pub fn pending_keys(&self) -> &[Chord] {
        self.prefix.as_ref().map(|p| p.keys.as_slice()).unwrap_or(&[])
    }

    /// The submap a pending prefix is currently resolving against.
    pub fn pending_submap(&self) -> Option<Mode> {
        self.prefix.as_ref().map(|p| p.submap)
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.subscribe(listener);
    }

    pub fn set_prefix_timeout(&mut self, ticks: u32) {
        self.prefix_timeout = ticks;
    }

    /// Change the chord that unconditionally aborts a pending prefix.
    pub fn set_escape(&mut self, chord: Chord) {
        self.escape = chord;
    }

    fn ensure_declared(&self, mode: Mode) -> Result<()> {
        if self.registry.contains(mode) {
            Ok(())
        } else {
            Err(Error::UndeclaredMode {
                name: self.registry.display(mode),
            })
        }
    }

    fn ensure_targets_declared(&self, binding: &Binding<C>) -> Result<()> {
        for entry in &binding.chain {
            if let Some(target) = entry.target {
                self.ensure_declared(target)?;
            }
        }
        Ok(())
    }

    /// Append a handler to the chain bound at `(mode, input)`, creating the
    /// binding if absent. Fails immediately on undeclared modes, including
    /// the entry's target mode.
    pub fn bind(&mut self, mode: Mode, input: impl Into<Input>, entry: HandlerEntry<C>) -> Result<()> {
        self.ensure_declared(mode)?;
        if let Some(target) = entry.target {
            self.ensure_declared(target)?;
        }
        match self.tables[mode.index()].bindings.entry(input.into()) {
            Entry::Occupied(mut occupied) => {
                if matches!(occupied.get(), Slot::Prefix(_)) {
                    warn!(input = %occupied.key(), "replacing prefix binding with handler chain");
                    occupied.insert(Slot::Chain(Binding::single(entry)));
                } else if let Slot::Chain(binding) = occupied.get_mut() {
                    binding.chain.push(entry);
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Chain(Binding::single(entry)));
            },
        }
        Ok(())
    }

    /// Like [`bind`](Self::bind), but the entry unbinds itself after its
    /// first invocation.
    pub fn bind_once(
        &mut self,
        mode: Mode,
        input: impl Into<Input>,
        mut entry: HandlerEntry<C>,
    ) -> Result<()> {
        entry.once = true;
        self.bind(mode, input, entry)
    }

    /// Replace whatever is bound at `(mode, input)` with the given chain.
    /// Registration is idempotent; the prior entry is discarded, not stacked.
    pub fn rebind(&mut self, mode: Mode, input: impl Into<Input>, binding: Binding<C>) -> Result<()> {
        self.ensure_declared(mode)?;
        self.ensure_targets_declared(&binding)?;
        self.tables[mode.index()]
            .bindings
            .insert(input.into(), Slot::Chain(binding));
        Ok(())
    }

    /// Remove the binding at `(mode, input)`. Returns whether one existed.
    pub fn unbind(&mut self, mode: Mode, input: impl Into<Input>) -> Result<bool> {
        self.ensure_declared(mode)?;
        Ok(self.tables[mode.index()]
            .bindings
            .shift_remove(&input.into())
            .is_some())
    }

    /// Declare `chord` in `mode` as a prefix whose continuation keys resolve
    /// in `submap`'s table.
    pub fn bind_prefix(&mut self, mode: Mode, chord: Chord, submap: Mode) -> Result<()> {
        self.ensure_declared(mode)?;
        self.ensure_declared(submap)?;
        self.tables[mode.index()]
            .bindings
            .insert(Input::Key(chord), Slot::Prefix(submap));
        Ok(())
    }

    /// Install the catch-all chain run when no literal binding matches in
    /// `mode`. Replaces any previous fallback.
    pub fn set_fallback(&mut self, mode: Mode, binding: Binding<C>) -> Result<()> {
        self.ensure_declared(mode)?;
        self.ensure_targets_declared(&binding)?;
        self.tables[mode.index()].fallback = Some(binding);
        Ok(())
    }

    /// The chain currently bound at `(mode, input)`, if any. Prefix entries
    /// resolve to `None`; see [`prefix_target`](Self::prefix_target).
    pub fn lookup(&self, mode: Mode, input: &Input) -> Option<&Binding<C>> {
        match self.tables.get(mode.index())?.bindings.get(input)? {
            Slot::Chain(binding) => Some(binding),
            Slot::Prefix(_) => None,
        }
    }

    /// Iterate the literal bindings of `mode` in registration order, for
    /// introspection and help output. Prefix entries yield the submap they
    /// lead to instead of a chain.
    pub fn bindings(&self, mode: Mode) -> impl Iterator<Item = (&Input, BindingInfo<'_, C>)> {
        self.tables.get(mode.index()).into_iter().flat_map(|table| {
            table.bindings.iter().map(|(input, slot)| match slot {
                Slot::Chain(binding) => (input, BindingInfo::Chain(binding)),
                Slot::Prefix(submap) => (input, BindingInfo::Prefix(*submap)),
            })
        })
    }

    /// The submap a prefix chord leads to, if `(mode, chord)` is a prefix.
    pub fn prefix_target(&self, mode: Mode, chord: Chord) -> Option<Mode> {
        match self.tables.get(mode.index())?.bindings.get(&Input::Key(chord))? {
            Slot::Prefix(submap) => Some(*submap),
            Slot::Chain(_) => None,
        }
    }

    /// Force the current mode from outside a dispatch cycle. Clears any
    /// pending prefix; listeners observe the change with a synthetic
    /// [`FORCED_INPUT`] input.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.ensure_declared(mode)?;
        self.prefix = None;
        if mode != self.current {
            let old = self.current;
            self.previous = old;
            self.current = mode;
            debug!(
                from = %self.registry.display(old),
                to = %self.registry.display(mode),
                "forced mode transition"
            );
            self.notify(Notice {
                old_mode: old,
                new_mode: mode,
                input: Input::named(FORCED_INPUT),
                label: None,
                kind: NoticeKind::Transition,
            });
        }
        Ok(())
    }

    /// Advance the idle clock. The host loop calls this at its own cadence;
    /// a pending prefix that idles past the timeout resets silently.
    pub fn tick(&mut self) {
        let timed_out = match self.prefix.as_mut() {
            Some(state) => {
                state.idle_ticks += 1;
                state.idle_ticks > self.prefix_timeout
            },
            None => false,
        };
        if timed_out {
            self.prefix = None;
            debug!("pending prefix timed out; returning to base mode");
        }
    }

    /// The single dispatch entry point.
    ///
    /// Resolution order: pending prefix submap (key events only), then the
    /// current mode's literal bindings, then the global mode's literal
    /// bindings, then the current mode's fallback chain, then the global
    /// fallback chain. Global bindings are the implicit base layer beneath
    /// every mode unless shadowed.
    ///
    /// At most one mode transition is applied per cycle; when several
    /// handlers request one, the last handler executed before consumption
    /// wins. A failing handler restores the entry mode, clears prefix state,
    /// emits one [`NoticeKind::HandlerFailed`], and yields `Unhandled` so
    /// the host's default behavior still applies.
    pub fn dispatch(&mut self, ctx: &mut C, input: &Input) -> Outcome {
        if self.prefix.is_some() {
            match input {
                Input::Key(chord) => return self.dispatch_pending(ctx, *chord, input),
                // Named notifications pass through without disturbing a
                // pending key sequence.
                Input::Named(_) => {},
            }
        }
        self.dispatch_current(ctx, input)
    }

    fn dispatch_current(&mut self, ctx: &mut C, input: &Input) -> Outcome {
        let mode = self.current;
        match self.resolve(mode, input) {
            Some((_, Slot::Prefix(submap))) => self.enter_prefix(mode, submap, input),
            Some((at, Slot::Chain(binding))) => self.run_chain(ctx, input, at, binding),
            None => {
                trace!(mode = %self.registry.display(mode), input = %input, "unbound event");
                Outcome::Unhandled
            },
        }
    }

    fn resolve(&self, mode: Mode, input: &Input) -> Option<(BindingRef, Slot<C>)> {
        let table = &self.tables[mode.index()];
        if let Some(slot) = table.bindings.get(input) {
            return Some((
                BindingRef {
                    mode,
                    input: Some(input.clone()),
                },
                slot.clone(),
            ));
        }
        if mode != Mode::GLOBAL {
            if let Some(slot) = self.tables[Mode::GLOBAL.index()].bindings.get(input) {
                return Some((
                    BindingRef {
                        mode: Mode::GLOBAL,
                        input: Some(input.clone()),
                    },
                    slot.clone(),
                ));
            }
        }
        if let Some(fallback) = &table.fallback {
            return Some((BindingRef { mode, input: None }, Slot::Chain(fallback.clone())));
        }
        if mode != Mode::GLOBAL {
            if let Some(fallback) = &self.tables[Mode::GLOBAL.index()].fallback {
                return Some((
                    BindingRef {
                        mode: Mode::GLOBAL,
                        input: None,
                    },
                    Slot::Chain(fallback.clone()),
                ));
            }
        }
        None
    }

    fn enter_prefix(&mut self, origin: Mode, submap: Mode, input: &Input) -> Outcome {
        let Input::Key(chord) = input else {
            // Prefix entries are only bound to key chords.
            return Outcome::Unhandled;
        };
        self.prefix = Some(PrefixState::enter(origin, submap, *chord));
        debug!(map = %self.registry.display(submap), "prefix sequence started");
        let label = self.registry.name(submap).map(SmolStr::new);
        self.notify(Notice {
            old_mode: origin,
            new_mode: origin,
            input: input.clone(),
            label,
            kind: NoticeKind::Consumed,
        });
        Outcome::Handled
    }

    fn dispatch_pending(&mut self, ctx: &mut C, chord: Chord, input: &Input) -> Outcome {
        // Escape aborts unconditionally and returns to the pre-prefix mode,
        // regardless of which submap is active.
        if chord == self.escape {
            if let Some(state) = self.prefix.take() {
                debug!(map = %self.registry.display(state.submap), "prefix sequence aborted");
                self.notify(Notice {
                    old_mode: state.origin,
                    new_mode: self.current,
                    input: input.clone(),
                    label: Some(SmolStr::new_static("quit")),
                    kind: NoticeKind::Consumed,
                });
            }
            return Outcome::Handled;
        }

        let submap = match &self.prefix {
            Some(state) => state.submap,
            None => return self.dispatch_current(ctx, input),
        };

        let resolved = self.tables[submap.index()].bindings.get(input).cloned();
        match resolved {
            Some(Slot::Prefix(next)) => {
                if let Some(state) = self.prefix.as_mut() {
                    state.descend(next, chord);
                }
                let label = self.registry.name(next).map(SmolStr::new);
                self.notify(Notice {
                    old_mode: self.current,
                    new_mode: self.current,
                    input: input.clone(),
                    label,
                    kind: NoticeKind::Consumed,
                });
                Outcome::Handled
            },
            Some(Slot::Chain(binding)) => {
                self.prefix = None;
                let at = BindingRef {
                    mode: submap,
                    input: Some(input.clone()),
                };
                self.run_chain(ctx, input, at, binding)
            },
            None => {
                // Unmatched continuation: silent reset to the base mode, and
                // no global fallback while a prefix was pending.
                self.prefix = None;
                debug!(
                    map = %self.registry.display(submap),
                    input = %input,
                    "unmatched key in prefix map; returning to base mode"
                );
                Outcome::Unhandled
            },
        }
    }

    fn run_chain(&mut self, ctx: &mut C, input: &Input, at: BindingRef, binding: Binding<C>) -> Outcome {
        let entry_mode = self.current;
        let mut transition: Option<(Mode, Option<SmolStr>)> = None;
        let mut consumed_label: Option<SmolStr> = None;
        let mut consumed = false;
        let mut spent_once: Vec<usize> = Vec::new();

        for (index, entry) in binding.chain.iter().enumerate() {
            if entry.once {
                spent_once.push(index);
            }
            let step = match (entry.action)(ctx, input) {
                Ok(step) => step,
                Err(error) => {
                    self.forget_once(&at, &spent_once);
                    return self.recover(input, entry_mode, entry.label.clone(), error.to_string());
                },
            };
            match step {
                Step::Consumed => {
                    consumed = true;
                    consumed_label = entry.label.clone();
                    if let Some(target) = entry.target {
                        transition = Some((target, entry.label.clone()));
                    }
                    if binding.policy == ChainPolicy::UntilConsumed {
                        break;
                    }
                },
                Step::Skip => {},
                Step::Transition(target) => {
                    if !self.registry.contains(target) {
                        self.forget_once(&at, &spent_once);
                        let message =
                            format!("transition to undeclared mode {}", self.registry.display(target));
                        return self.recover(input, entry_mode, entry.label.clone(), message);
                    }
                    consumed = true;
                    consumed_label = entry.label.clone();
                    transition = Some((target, entry.label.clone()));
                    if binding.policy == ChainPolicy::UntilConsumed {
                        break;
                    }
                },
            }
        }

        self.forget_once(&at, &spent_once);

        if !consumed {
            trace!(input = %input, "all handlers skipped; deferring to host");
            return Outcome::Unhandled;
        }

        if let Some((target, label)) = transition {
            if target != self.current {
                let old = self.current;
                self.previous = old;
                self.current = target;
                debug!(
                    from = %self.registry.display(old),
                    to = %self.registry.display(target),
                    input = %input,
                    "mode transition"
                );
                self.notify(Notice {
                    old_mode: old,
                    new_mode: target,
                    input: input.clone(),
                    label,
                    kind: NoticeKind::Transition,
                });
            }
        }

        self.notify(Notice {
            old_mode: entry_mode,
            new_mode: self.current,
            input: input.clone(),
            label: consumed_label,
            kind: NoticeKind::Consumed,
        });
        Outcome::Handled
    }

    /// Handler failure recovery: restore the entry mode, drop any pending
    /// prefix, report exactly once, and leave the event to the host.
    fn recover(&mut self, input: &Input, entry_mode: Mode, label: Option<SmolStr>, message: String) -> Outcome {
        self.current = entry_mode;
        self.prefix = None;
        warn!(
            mode = %self.registry.display(entry_mode),
            input = %input,
            label = label.as_deref().unwrap_or("?"),
            %message,
            "handler failed; event dropped"
        );
        self.notify(Notice {
            old_mode: entry_mode,
            new_mode: entry_mode,
            input: input.clone(),
            label,
            kind: NoticeKind::HandlerFailed { message },
        });
        Outcome::Unhandled
    }

    /// Drop one-shot entries that were invoked this cycle, removing the whole
    /// binding when its chain empties out.
    fn forget_once(&mut self, at: &BindingRef, spent: &[usize]) {
        if spent.is_empty() {
            return;
        }
        let table = &mut self.tables[at.mode.index()];
        let binding = match &at.input {
            Some(input) => match table.bindings.get_mut(input) {
                Some(Slot::Chain(binding)) => binding,
                _ => return,
            },
            None => match table.fallback.as_mut() {
                Some(binding) => binding,
                None => return,
            },
        };
        let mut index = 0;
        binding.chain.retain(|_| {
            let keep = !spent.contains(&index);
            index += 1;
            keep
        });
        if binding.chain.is_empty() {
            match &at.input {
                Some(input) => {
                    table.bindings.shift_remove(input);
                },
                None => table.fallback = None,
            }
        }
    }

    fn notify(&self, notice: Notice) {
        if self.listeners.is_empty() {
            return;
        }
        self.listeners.notify(&notice);
    }
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use std::sync::{Arc, Mutex};

    type Ctx = Vec<&'static str>;

    fn consume(tag: &'static str) -> HandlerEntry<Ctx> {
        HandlerEntry::simple(move |ctx: &mut Ctx, _| {
            ctx.push(tag);
            Step::Consumed
        })
        .with_label(tag)
    }

    fn skip(tag: &'static str) -> HandlerEntry<Ctx> {
        HandlerEntry::simple(move |ctx: &mut Ctx, _| {
            ctx.push(tag);
            Step::Skip
        })
        .with_label(tag)
    }

    fn record_notices(dispatcher: &mut Dispatcher<Ctx>) -> Arc<Mutex<Vec<Notice>>> {
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notices);
        dispatcher.subscribe(Arc::new(move |notice| {
            sink.lock().expect("Failed to lock notice log").push(notice.clone());
        }));
        notices
    }

    #[test]
    fn test_bind_against_undeclared_mode_fails() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let foreign = {
            let mut other: Dispatcher<Ctx> = Dispatcher::new();
            other.declare_mode("elsewhere")
        };
        let result = dispatcher.bind(foreign, 'a', consume("a"));
        assert!(matches!(result, Err(Error::UndeclaredMode { .. })));
    }

    #[test]
    fn test_rebind_replaces_prior_chain() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .bind(Mode::GLOBAL, 'a', consume("old"))
            .expect("Failed to bind");
        dispatcher
            .rebind(Mode::GLOBAL, 'a', Binding::single(consume("new")))
            .expect("Failed to rebind");

        let binding = dispatcher
            .lookup(Mode::GLOBAL, &Input::from('a'))
            .expect("binding should exist");
        assert_eq!(binding.chain.len(), 1);
        assert_eq!(binding.chain[0].label.as_deref(), Some("new"));

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(ctx, vec!["new"]);
    }

    #[test]
    fn test_global_bindings_apply_in_every_mode() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        dispatcher
            .bind(Mode::GLOBAL, 'g', consume("global"))
            .expect("Failed to bind");
        dispatcher.set_mode(comp).expect("Failed to set mode");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::from('g'));
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(ctx, vec!["global"]);
    }

    #[test]
    fn test_mode_binding_shadows_global() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        dispatcher
            .bind(Mode::GLOBAL, 'g', consume("global"))
            .expect("Failed to bind");
        dispatcher.bind(comp, 'g', consume("comp")).expect("Failed to bind");
        dispatcher.set_mode(comp).expect("Failed to set mode");

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('g'));
        assert_eq!(ctx, vec!["comp"]);
    }

    #[test]
    fn test_unbound_event_is_unhandled() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let mut ctx = Ctx::new();
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('z')), Outcome::Unhandled);
    }

    #[test]
    fn test_skip_chain_defers_to_host() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .rebind(
                Mode::GLOBAL,
                'a',
                Binding::new(vec![skip("first"), skip("second")]),
            )
            .expect("Failed to rebind");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(outcome, Outcome::Unhandled);
        assert_eq!(ctx, vec!["first", "second"]);
    }

    #[test]
    fn test_until_consumed_stops_at_first_consumer() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .rebind(
                Mode::GLOBAL,
                'a',
                Binding::new(vec![skip("styler"), consume("texter"), consume("unreached")]),
            )
            .expect("Failed to rebind");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(ctx, vec!["styler", "texter"]);
    }

    #[test]
    fn test_run_all_invokes_every_handler() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .rebind(
                Mode::GLOBAL,
                'a',
                Binding::new(vec![consume("first"), consume("second")])
                    .with_policy(ChainPolicy::RunAll),
            )
            .expect("Failed to rebind");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(ctx, vec!["first", "second"]);
    }

    #[test]
    fn test_transition_consults_new_mode_table() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let hist = dispatcher.declare_mode("history-comp");
        let tab = Chord::plain(Key::Named(crate::key::NamedKey::Tab));
        dispatcher
            .bind(
                Mode::GLOBAL,
                tab,
                consume("start-comp").with_target(hist),
            )
            .expect("Failed to bind");
        dispatcher.bind(hist, tab, consume("next-comp")).expect("Failed to bind");

        let mut ctx = Ctx::new();
        assert_eq!(
            dispatcher.dispatch(&mut ctx, &Input::Key(tab)),
            Outcome::Handled
        );
        assert_eq!(dispatcher.mode(), hist);

        assert_eq!(
            dispatcher.dispatch(&mut ctx, &Input::Key(tab)),
            Outcome::Handled
        );
        assert_eq!(ctx, vec!["start-comp", "next-comp"]);
        assert_eq!(dispatcher.previous_mode(), Mode::GLOBAL);
    }

    #[test]
    fn test_last_transition_before_consumption_wins() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let first = dispatcher.declare_mode("first");
        let second = dispatcher.declare_mode("second");
        dispatcher
            .rebind(
                Mode::GLOBAL,
                'a',
                Binding::new(vec![
                    HandlerEntry::simple(move |_, _| Step::Transition(first)).with_label("one"),
                    HandlerEntry::simple(move |_, _| Step::Transition(second)).with_label("two"),
                ])
                .with_policy(ChainPolicy::RunAll),
            )
            .expect("Failed to rebind");

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(dispatcher.mode(), second);
    }

    #[test]
    fn test_dynamic_transition_overrides_static_target() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let declared = dispatcher.declare_mode("declared");
        let dynamic = dispatcher.declare_mode("dynamic");
        dispatcher
            .bind(
                Mode::GLOBAL,
                'a',
                HandlerEntry::simple(move |_, _| Step::Transition(dynamic)).with_target(declared),
            )
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(dispatcher.mode(), dynamic);
    }

    #[test]
    fn test_handler_failure_reports_once_and_recovers() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        let notices = record_notices(&mut dispatcher);
        dispatcher
            .bind(
                Mode::GLOBAL,
                'a',
                HandlerEntry::new(|_: &mut Ctx, _| Err("inspection failed".into()))
                    .with_label("inspect")
                    .with_target(comp),
            )
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::from('a'));
        assert_eq!(outcome, Outcome::Unhandled);
        assert_eq!(dispatcher.mode(), Mode::GLOBAL);

        let notices = notices.lock().expect("Failed to lock notice log");
        let failures: Vec<_> = notices
            .iter()
            .filter(|n| matches!(n.kind, NoticeKind::HandlerFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].label.as_deref(), Some("inspect"));
        assert_eq!(notices.len(), 1, "no transition or consumed notice after failure");
    }

    #[test]
    fn test_failure_in_run_all_chain_stops_the_chain() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .rebind(
                Mode::GLOBAL,
                'a',
                Binding::new(vec![
                    consume("before"),
                    HandlerEntry::new(|_: &mut Ctx, _| Err("boom".into())).with_label("bad"),
                    consume("after"),
                ])
                .with_policy(ChainPolicy::RunAll),
            )
            .expect("Failed to rebind");

        let mut ctx = Ctx::new();
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('a')), Outcome::Unhandled);
        assert_eq!(ctx, vec!["before"]);
    }

    #[test]
    fn test_transition_to_foreign_mode_is_a_failure() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let notices = record_notices(&mut dispatcher);
        let foreign = {
            let mut other: Dispatcher<Ctx> = Dispatcher::new();
            other.declare_mode("a");
            other.declare_mode("b")
        };
        dispatcher
            .bind(
                Mode::GLOBAL,
                'a',
                HandlerEntry::simple(move |_, _| Step::Transition(foreign)),
            )
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('a')), Outcome::Unhandled);
        assert_eq!(dispatcher.mode(), Mode::GLOBAL);
        let notices = notices.lock().expect("Failed to lock notice log");
        assert!(matches!(notices[0].kind, NoticeKind::HandlerFailed { .. }));
    }

    #[test]
    fn test_fallback_runs_when_no_literal_binding() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        dispatcher.bind(comp, 'x', consume("literal")).expect("Failed to bind");
        dispatcher
            .set_fallback(comp, Binding::single(consume("fallback").with_target(Mode::GLOBAL)))
            .expect("Failed to set fallback");
        dispatcher.set_mode(comp).expect("Failed to set mode");

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('x'));
        assert_eq!(ctx, vec!["literal"], "literal binding wins over fallback");

        dispatcher.dispatch(&mut ctx, &Input::from('q'));
        assert_eq!(ctx, vec!["literal", "fallback"]);
        assert_eq!(dispatcher.mode(), Mode::GLOBAL, "fallback left the mode");
    }

    #[test]
    fn test_bind_once_fires_exactly_once() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .bind_once(Mode::GLOBAL, 'o', consume("once"))
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('o')), Outcome::Handled);
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('o')), Outcome::Unhandled);
        assert_eq!(ctx, vec!["once"]);
        assert!(dispatcher.lookup(Mode::GLOBAL, &Input::from('o')).is_none());
    }

    #[test]
    fn test_unbind_removes_binding() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher.bind(Mode::GLOBAL, 'a', consume("a")).expect("Failed to bind");
        assert!(dispatcher.unbind(Mode::GLOBAL, 'a').expect("Failed to unbind"));
        assert!(!dispatcher.unbind(Mode::GLOBAL, 'a').expect("Failed to unbind"));

        let mut ctx = Ctx::new();
        assert_eq!(dispatcher.dispatch(&mut ctx, &Input::from('a')), Outcome::Unhandled);
    }

    #[test]
    fn test_set_mode_notifies_with_forced_input() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        let notices = record_notices(&mut dispatcher);

        dispatcher.set_mode(comp).expect("Failed to set mode");
        let notices = notices.lock().expect("Failed to lock notice log");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Transition);
        assert_eq!(notices[0].input, Input::named(FORCED_INPUT));
        assert_eq!(notices[0].new_mode, comp);
    }

    #[test]
    fn test_named_event_dispatch() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        dispatcher
            .bind(Mode::GLOBAL, Input::named("shell_activated"), consume("activated"))
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        let outcome = dispatcher.dispatch(&mut ctx, &Input::named("shell_activated"));
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(ctx, vec!["activated"]);
    }

    #[test]
    fn test_notice_order_transition_then_consumed() {
        let mut dispatcher: Dispatcher<Ctx> = Dispatcher::new();
        let comp = dispatcher.declare_mode("comp");
        let notices = record_notices(&mut dispatcher);
        dispatcher
            .bind(Mode::GLOBAL, 'a', consume("go").with_target(comp))
            .expect("Failed to bind");

        let mut ctx = Ctx::new();
        dispatcher.dispatch(&mut ctx, &Input::from('a'));
        let notices = notices.lock().expect("Failed to lock notice log");
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].kind, NoticeKind::Transition);
        assert_eq!((notices[0].old_mode, notices[0].new_mode), (Mode::GLOBAL, comp));
        assert_eq!(notices[1].kind, NoticeKind::Consumed);
        assert_eq!((notices[1].old_mode, notices[1].new_mode), (Mode::GLOBAL, comp));
    }
}
