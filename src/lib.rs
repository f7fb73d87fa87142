//! runt - run test-context logic outside the built-in test harness.
//!
//! Test logic is written against [`TestingContext`] and handed to [`run`],
//! which drives it on the current call stack and reduces it to a single
//! `Result`.

pub mod config;
pub mod error;
pub mod host;
pub mod test_utils;
pub mod testing;

pub use config::HarnessConfig;
pub use error::{Result, RuntError};
pub use testing::{Cancellation, Runner, TestContext, TestOutcome, TestingContext, run};
