//! Test execution harness
//!
//! Runs test logic written against [`TestingContext`] outside the built-in
//! test runner, capturing its log and its pass/fail/skip outcome.

mod cancel;
mod context;
mod outcome;
mod panic_trace;
mod runner;
mod signal;

pub use cancel::*;
pub use context::*;
pub use outcome::*;
pub use runner::*;
pub use signal::Signal;
