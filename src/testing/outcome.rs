use crate::error::{Result, RuntError};

/// Final state of a root test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    /// Skipped without failing. Reports as success through [`into_result`](Self::into_result).
    Skipped,
    /// Carries the root context's own log. Subtest logs are not included.
    Failed { logs: String },
}

impl TestOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Passed | Self::Skipped => Ok(()),
            Self::Failed { logs } => Err(RuntError::TestFailed { logs }),
        }
    }
}
