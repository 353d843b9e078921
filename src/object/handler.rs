use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

/// Holds a caller-registered event handler.
///
/// The handler is taken out of the slot while it runs, so it may replace itself or issue
/// requests on its own object without deadlocking. A panic is caught and logged at this
/// boundary and the handler is put back for the next event.
pub(crate) struct HandlerSlot<H: ?Sized> {
    slot: Mutex<Option<Box<H>>>,
}

impl<H: ?Sized> HandlerSlot<H> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, handler: Box<H>) {
        *self.slot.lock() = Some(handler);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Runs the handler if one is installed. Returns whether it ran to completion.
    pub(crate) fn invoke(&self, what: &str, call: impl FnOnce(&mut H)) -> bool {
        let Some(mut handler) = self.slot.lock().take() else {
            return false;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&mut *handler)));
        if outcome.is_err() {
            log::error!("{what} handler panicked; event dropped, dispatch continues");
        }

        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(handler);
        }
        outcome.is_ok()
    }
}

impl<H: ?Sized> Default for HandlerSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> std::fmt::Debug for HandlerSlot<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("set", &self.is_set())
            .finish()
    }
}
