use crate::{dispatch::Dispatcher, event::Input, mode::Mode, Outcome};
use parking_lot::Mutex;
use std::sync::Arc;

/// A dispatcher behind one lock, for hosts whose events can originate from
/// more than one place (a UI thread plus timers, typically). Dispatch is
/// still cooperative: each call runs to completion before the next enters.
///
/// Single-source hosts should hold a [`Dispatcher`] directly; `&mut self`
/// already serializes them.
pub struct SharedDispatcher<C> {
    inner: Arc<Mutex<Dispatcher<C>>>,
}

impl<C> SharedDispatcher<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dispatcher)),
        }
    }

    pub fn dispatch(&self, ctx: &mut C, input: &Input) -> Outcome {
        self.inner.lock().dispatch(ctx, input)
    }

    pub fn tick(&self) {
        self.inner.lock().tick();
    }

    pub fn mode(&self) -> Mode {
        self.inner.lock().mode()
    }

    /// Run `f` with exclusive access, for setup or introspection that spans
    /// multiple calls.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dispatcher<C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<C> Clone for SharedDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
