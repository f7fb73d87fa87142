//! Per-test state and the capability surface test logic is written against.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::ffi::OsStr;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::config::HarnessConfig;
use crate::error::{Result, RuntError};
use crate::host::{Host, OsHost};

use super::cancel::Cancellation;
use super::panic_trace;
use super::signal::{self, Exit, Signal};

type Cleanup = Box<dyn FnOnce() -> Result<()>>;

/// Operations available to test logic.
///
/// Methods returning `!` unwind to the nearest boundary owned by the runner or
/// by an enclosing subtest; code after them in the same frame never runs.
pub trait TestingContext {
    fn name(&self) -> &str;

    /// Append one formatted line to the log.
    fn log_args(&self, args: fmt::Arguments<'_>);

    /// Mark this test and every ancestor failed. Execution continues.
    fn fail(&self);

    /// Mark failed (propagated) and stop this test immediately.
    fn fail_now(&self) -> !;

    /// Mark this test skipped and stop it immediately. Ancestors are untouched.
    fn skip_now(&self) -> !;

    fn failed(&self) -> bool;

    fn skipped(&self) -> bool;

    /// Everything logged so far, one line per call.
    fn logs(&self) -> String;

    /// Register an action to run, most recent first, when this test finishes.
    fn cleanup(&self, f: Box<dyn FnOnce()>);

    /// Run `body` as a nested test. Returns `true` unless the subtest failed.
    fn subtest(&self, name: &str, body: &mut dyn FnMut(&dyn TestingContext)) -> bool;

    fn cancellation(&self) -> &Cancellation;

    /// Create a fresh directory, removed when the test finishes.
    fn temp_dir(&self) -> PathBuf;

    /// Change the working directory until the test finishes.
    fn chdir(&self, dir: &Path);

    /// Set an environment variable until the test finishes.
    fn setenv(&self, key: &str, value: &str);

    fn log(&self, message: &dyn Display) {
        self.log_args(format_args!("{message}"));
    }

    fn error(&self, message: &dyn Display) {
        self.log(message);
        self.fail();
    }

    fn error_args(&self, args: fmt::Arguments<'_>) {
        self.log_args(args);
        self.fail();
    }

    fn fatal(&self, message: &dyn Display) -> ! {
        self.log(message);
        self.fail_now()
    }

    fn fatal_args(&self, args: fmt::Arguments<'_>) -> ! {
        self.log_args(args);
        self.fail_now()
    }

    fn skip(&self, message: &dyn Display) -> ! {
        self.log(message);
        self.skip_now()
    }

    fn skip_args(&self, args: fmt::Arguments<'_>) -> ! {
        self.log_args(args);
        self.skip_now()
    }

    /// No-op; present so helpers written for other harnesses keep compiling.
    fn helper(&self) {}

    fn deadline(&self) -> Option<Instant> {
        self.cancellation().deadline()
    }
}

/// State of one test invocation.
///
/// A context lives for exactly one callback invocation. The parent link is a
/// plain borrow: children never outlive the frame that created them.
pub struct TestContext<'p> {
    name: String,
    cancellation: Cancellation,
    parent: Option<&'p TestContext<'p>>,
    logs: RefCell<String>,
    failed: Cell<bool>,
    skipped: Cell<bool>,
    cleanups: RefCell<Vec<Cleanup>>,
    host: Rc<dyn Host>,
    config: Rc<HarnessConfig>,
}

impl TestContext<'static> {
    /// Create a root context with default config and the real OS host.
    #[must_use]
    pub fn new(cancellation: Cancellation, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cancellation,
            parent: None,
            logs: RefCell::new(String::new()),
            failed: Cell::new(false),
            skipped: Cell::new(false),
            cleanups: RefCell::new(Vec::new()),
            host: Rc::new(OsHost),
            config: Rc::new(HarnessConfig::default()),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = Rc::new(config);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Rc<dyn Host>) -> Self {
        self.host = host;
        self
    }
}

impl<'p> TestContext<'p> {
    fn child(&self, name: &str) -> TestContext<'_> {
        TestContext {
            name: name.to_string(),
            cancellation: self.cancellation.clone(),
            parent: Some(self),
            logs: RefCell::new(String::new()),
            failed: Cell::new(false),
            skipped: Cell::new(false),
            cleanups: RefCell::new(Vec::new()),
            host: Rc::clone(&self.host),
            config: Rc::clone(&self.config),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&TestContext<'p>> {
        self.parent
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `f` against a child context inside its own boundary, then run the
    /// child's cleanups. A failure anywhere in the child has already marked
    /// this context failed by the time this returns.
    pub fn run_subtest<F>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce(&TestContext<'_>),
    {
        let sub = self.child(name);
        debug!(parent = %self.name, subtest = %name, "running subtest");
        sub.execute(f);
        debug!(
            subtest = %name,
            failed = sub.failed(),
            skipped = sub.skipped(),
            "subtest finished"
        );
        !sub.failed()
    }

    /// Invoke `body` inside an interception boundary, record whatever escaped,
    /// then drain cleanups.
    pub(crate) fn execute<F>(&self, body: F)
    where
        F: FnOnce(&Self),
    {
        let exit = signal::intercept(|| body(self));
        self.absorb(exit);
        self.run_cleanups();
    }

    fn absorb(&self, exit: Exit) {
        let payload = match exit {
            Exit::Returned => return,
            Exit::Signalled(signal) => {
                trace!(test = %self.name, ?signal, "absorbed termination signal");
                return;
            }
            Exit::Panicked(payload) => payload,
        };
        warn!(test = %self.name, "intercepted unexpected panic");
        match signal::describe(&*payload) {
            Some(text) => self.error_args(format_args!("PANIC: {text}")),
            None => {
                self.error(&"PANIC: panic payload is not a message");
                // Nothing matching means the hook never saw this payload, as with resume_unwind.
                let stashed = panic_trace::take(&*payload);
                if self.config.diagnostics.capture_traces {
                    self.log(&stashed.unwrap_or_else(Backtrace::force_capture));
                }
            }
        }
    }

    fn run_cleanups(&self) {
        loop {
            // Released before running: a cleanup may register another one.
            let next = self.cleanups.borrow_mut().pop();
            let Some(cleanup) = next else {
                break;
            };
            let mut outcome = Ok(());
            let exit = signal::intercept(|| outcome = cleanup());
            if let Err(err) = outcome {
                self.error_args(format_args!("cleanup: {err}"));
            }
            self.absorb(exit);
        }
    }

    fn push_cleanup(&self, cleanup: Cleanup) {
        self.cleanups.borrow_mut().push(cleanup);
    }

    fn check<T>(&self, result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => self.fatal(&err),
        }
    }
}

impl TestingContext for TestContext<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn log_args(&self, args: fmt::Arguments<'_>) {
        // Formatted before borrowing: a Display impl may log to this context.
        let line = fmt::format(args);
        if self.config.diagnostics.echo_logs {
            info!(test = %self.name, "{line}");
        }
        let mut logs = self.logs.borrow_mut();
        logs.push_str(&line);
        logs.push('\n');
    }

    fn fail(&self) {
        self.failed.set(true);
        if let Some(parent) = self.parent {
            parent.fail();
        }
    }

    fn fail_now(&self) -> ! {
        self.fail();
        Signal::Failed.raise()
    }

    fn skip_now(&self) -> ! {
        self.skipped.set(true);
        Signal::Skipped.raise()
    }

    fn failed(&self) -> bool {
        self.failed.get()
    }

    fn skipped(&self) -> bool {
        self.skipped.get()
    }

    fn logs(&self) -> String {
        self.logs.borrow().clone()
    }

    fn cleanup(&self, f: Box<dyn FnOnce()>) {
        self.push_cleanup(Box::new(move || {
            f();
            Ok(())
        }));
    }

    fn subtest(&self, name: &str, body: &mut dyn FnMut(&dyn TestingContext)) -> bool {
        self.run_subtest(name, |sub| {
            let sub: &dyn TestingContext = sub;
            body(sub);
        })
    }

    fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    fn temp_dir(&self) -> PathBuf {
        let temp = &self.config.temp;
        let dir = self.check(self.host.create_temp_dir(&temp.root_dir(), &temp.prefix));
        if temp.keep {
            return dir.keep();
        }
        let path = dir.path().to_path_buf();
        self.push_cleanup(Box::new(move || dir.close().map_err(RuntError::from)));
        path
    }

    fn chdir(&self, dir: &Path) {
        let previous = self.check(self.host.current_dir());
        self.check(self.host.change_dir(dir));
        let host = Rc::clone(&self.host);
        self.push_cleanup(Box::new(move || host.change_dir(&previous)));
    }

    fn setenv(&self, key: &str, value: &str) {
        let previous = self.host.var(key);
        self.check(self.host.set_var(key, OsStr::new(value)));
        let host = Rc::clone(&self.host);
        let key = key.to_string();
        self.push_cleanup(Box::new(move || match previous {
            Some(value) => host.set_var(&key, &value),
            None => host.remove_var(&key),
        }));
    }
}

/// Formatted [`TestingContext::log_args`].
#[macro_export]
macro_rules! t_log {
    ($t:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::TestingContext as _;
        $t.log_args(::std::format_args!($($arg)+))
    }};
}

/// Formatted [`TestingContext::error_args`].
#[macro_export]
macro_rules! t_error {
    ($t:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::TestingContext as _;
        $t.error_args(::std::format_args!($($arg)+))
    }};
}

/// Formatted [`TestingContext::fatal_args`].
#[macro_export]
macro_rules! t_fatal {
    ($t:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::TestingContext as _;
        $t.fatal_args(::std::format_args!($($arg)+))
    }};
}

/// Formatted [`TestingContext::skip_args`].
#[macro_export]
macro_rules! t_skip {
    ($t:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::TestingContext as _;
        $t.skip_args(::std::format_args!($($arg)+))
    }};
}
