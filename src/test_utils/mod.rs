//! Shared test utilities for runt.

pub mod logging;

use std::fmt::Debug;

use crate::error::Result;
use crate::testing::{Cancellation, TestingContext, run};

/// Table-driven test case structure.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
}

/// Run every case as a subtest of one root test.
///
/// A mismatch or panic fails only its own subtest; the root log names each
/// failing case so the returned error lists them.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F) -> Result<()>
where
    I: Debug,
    E: Debug + PartialEq,
    F: Fn(I) -> E,
{
    run(Cancellation::new(), |t| {
        for case in cases {
            let name = case.name;
            let mut pending = Some(case);
            let passed = t.subtest(name, &mut |sub: &dyn TestingContext| {
                let Some(case) = pending.take() else {
                    return;
                };
                crate::t_log!(sub, "input: {:?}", case.input);
                let actual = test_fn(case.input);
                if actual != case.expected {
                    crate::t_error!(sub, "expected {:?}, got {:?}", case.expected, actual);
                }
            });
            if !passed {
                crate::t_error!(t, "case '{name}' failed");
            }
        }
    })
}
