//! Error types for runt.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntError {
    /// The root test ended failed. Carries the root context's full log.
    #[error("test failed:\n{logs}")]
    TestFailed { logs: String },

    #[error("create temp dir in {}: {source}", root.display())]
    TempDir {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("change directory to {}: {source}", path.display())]
    Chdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid environment variable: {0}")]
    InvalidEnvVar(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntError>;
