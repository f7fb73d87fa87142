//! Non-local exit markers and the interception boundary.
//!
//! `fail_now` and `skip_now` unwind with a [`Signal`] payload. Every frame
//! that owns a test context runs its callback through [`intercept`], which
//! is the only place in the crate that calls `catch_unwind`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::panic_trace;

/// Payload carried by the unwind of an immediate termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Failed,
    Skipped,
}

impl Signal {
    /// Unwind to the nearest boundary. Does not touch any context flags,
    /// so raising a marker directly leaves the outcome to whatever was
    /// already recorded.
    pub fn raise(self) -> ! {
        // resume_unwind skips the panic hook, so markers never print.
        panic::resume_unwind(Box::new(self))
    }
}

/// How an intercepted invocation ended.
pub(crate) enum Exit {
    Returned,
    Signalled(Signal),
    Panicked(Box<dyn Any + Send>),
}

pub(crate) fn intercept<F: FnOnce()>(f: F) -> Exit {
    let _armed = panic_trace::arm();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => Exit::Returned,
        Err(payload) => match payload.downcast::<Signal>() {
            Ok(signal) => Exit::Signalled(*signal),
            Err(payload) => Exit::Panicked(payload),
        },
    }
}

/// Human-readable text for payloads that describe themselves.
pub(crate) fn describe(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return Some((*text).to_string());
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return Some(text.clone());
    }
    if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
        return Some(format!("{err:#}"));
    }
    if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        return Some(err.to_string());
    }
    if let Some(err) = payload.downcast_ref::<crate::error::RuntError>() {
        return Some(err.to_string());
    }
    None
}
