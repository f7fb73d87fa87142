//! Top-level entry point: one root test in, one outcome out.

use std::rc::Rc;

use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::host::{Host, OsHost};

use super::cancel::Cancellation;
use super::context::{TestContext, TestingContext};
use super::outcome::TestOutcome;

/// Name given to every root context.
pub const ROOT_NAME: &str = "test";

/// Runs root tests with a fixed config and host.
pub struct Runner {
    config: HarnessConfig,
    host: Rc<dyn Host>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Runner {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            host: Rc::new(OsHost),
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: Rc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Run `f` against a fresh root context and report how it ended.
    pub fn run_with_outcome<F>(&self, cancellation: Cancellation, f: F) -> TestOutcome
    where
        F: FnOnce(&dyn TestingContext),
    {
        let root = TestContext::new(cancellation, ROOT_NAME)
            .with_config(self.config.clone())
            .with_host(Rc::clone(&self.host));

        root.execute(|t| {
            let t: &dyn TestingContext = t;
            f(t);
        });

        let outcome = if root.failed() {
            TestOutcome::Failed { logs: root.logs() }
        } else if root.skipped() {
            TestOutcome::Skipped
        } else {
            TestOutcome::Passed
        };
        debug!(
            failed = outcome.is_failed(),
            skipped = matches!(outcome, TestOutcome::Skipped),
            "test finished"
        );
        outcome
    }

    /// `Ok(())` unless the root ended failed; a skip counts as success.
    pub fn run<F>(&self, cancellation: Cancellation, f: F) -> Result<()>
    where
        F: FnOnce(&dyn TestingContext),
    {
        self.run_with_outcome(cancellation, f).into_result()
    }
}

/// Run one test with the default config. The error, if any, reads
/// `"test failed:\n"` followed by the root's log.
pub fn run<F>(cancellation: Cancellation, f: F) -> Result<()>
where
    F: FnOnce(&dyn TestingContext),
{
    Runner::default().run(cancellation, f)
}
