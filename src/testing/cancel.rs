//! Deadline and cancellation handle threaded through test contexts.
//!
//! The harness never consults this handle itself. It is carried unchanged
//! from the caller into every context so test logic can observe it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cheaply clonable cancellation handle. Clones share state; derived handles
/// (`child`, `with_*`) observe their ancestors but never affect them.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<State>,
}

#[derive(Debug, Default)]
struct State {
    flag: AtomicBool,
    deadline: Option<Instant>,
    value: Option<(String, String)>,
    parent: Option<Cancellation>,
}

impl Cancellation {
    /// A root handle that is never cancelled unless `cancel` is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self) -> Self {
        self.derive(None, None)
    }

    /// Derived handle that reports cancelled once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline), None)
    }

    /// Like [`with_deadline`](Self::with_deadline), relative to now. A timeout
    /// too large to represent yields a plain child without a deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Instant::now().checked_add(timeout), None)
    }

    /// Derived handle carrying one key/value pair.
    #[must_use]
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.derive(None, Some((key.into(), value.into())))
    }

    fn derive(&self, deadline: Option<Instant>, value: Option<(String, String)>) -> Self {
        Self {
            inner: Arc::new(State {
                flag: AtomicBool::new(false),
                deadline,
                value,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Mark this handle cancelled. Returns `true` only on the first call.
    pub fn cancel(&self) -> bool {
        self.inner
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Cancelled explicitly, through an ancestor, or by an expired deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.flag.load(Ordering::Acquire) {
            return true;
        }
        if self.inner.deadline.is_some_and(|at| Instant::now() >= at) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(Cancellation::is_cancelled)
    }

    /// Earliest deadline along the ancestor chain.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        let inherited = self.inner.parent.as_ref().and_then(Cancellation::deadline);
        match (self.inner.deadline, inherited) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Time left before the deadline; zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Nearest value for `key` along the ancestor chain.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        match &self.inner.value {
            Some((k, v)) if k == key => Some(v.as_str()),
            _ => self.inner.parent.as_ref().and_then(|parent| parent.value(key)),
        }
    }
}
