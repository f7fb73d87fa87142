//! Backtrace capture for unexpected panics inside test boundaries.
//!
//! A process-wide panic hook is installed the first time a boundary is armed.
//! While at least one boundary is armed on the current thread, the hook stays
//! quiet and stashes a backtrace for payloads that carry no message; the
//! boundary reports the panic in the test log instead. Panics elsewhere are
//! forwarded to the previously installed hook.
//!
//! The hook sees the payload before std moves it into its final box, so a
//! stash is matched to the payload that reached the boundary by type. Each
//! armed boundary starts with an empty stash.

use std::any::{Any, TypeId};
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic;
use std::sync::Once;

use super::signal;

static INSTALL: Once = Once::new();

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static LAST: RefCell<Option<(TypeId, Backtrace)>> = const { RefCell::new(None) };
}

/// Guard for one armed boundary on this thread.
pub(crate) struct Armed {
    _private: (),
}

impl Drop for Armed {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(armed.get().saturating_sub(1)));
    }
}

pub(crate) fn arm() -> Armed {
    INSTALL.call_once(install);
    clear();
    ARMED.with(|armed| armed.set(armed.get() + 1));
    Armed { _private: () }
}

/// Take the stashed backtrace if it was recorded for a payload of the same
/// type as `payload`. The stash is emptied either way.
pub(crate) fn take(payload: &(dyn Any + Send)) -> Option<Backtrace> {
    let expected = Any::type_id(payload);
    let stash = LAST.with(|last| last.borrow_mut().take());
    stash.and_then(|(id, trace)| (id == expected).then_some(trace))
}

pub(crate) fn clear() {
    LAST.with(|last| last.borrow_mut().take());
}

fn install() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if ARMED.with(Cell::get) == 0 {
            previous(info);
            return;
        }
        let payload = info.payload();
        let stash = signal::describe(payload)
            .is_none()
            .then(|| (Any::type_id(payload), Backtrace::force_capture()));
        LAST.with(|last| *last.borrow_mut() = stash);
    }));
}
