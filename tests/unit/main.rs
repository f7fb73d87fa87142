//! Behavioural tests for the runner, contexts and host integration.

mod config_tests;
