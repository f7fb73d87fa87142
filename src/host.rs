//! OS-facing operations used by test contexts.
//!
//! A [`Host`] only reports errors; the test context decides what to do with
//! them (it always routes them through `fatal`).

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Result, RuntError};

/// Process-level side effects a test may request.
pub trait Host {
    /// Create a uniquely named directory under `root`, creating `root` if needed.
    fn create_temp_dir(&self, root: &Path, prefix: &str) -> Result<TempDir>;

    fn current_dir(&self) -> Result<PathBuf>;

    fn change_dir(&self, dir: &Path) -> Result<()>;

    /// Raw value of `key`, which need not be valid UTF-8.
    fn var(&self, key: &str) -> Option<OsString>;

    fn set_var(&self, key: &str, value: &OsStr) -> Result<()>;

    fn remove_var(&self, key: &str) -> Result<()>;
}

/// [`Host`] backed by the real filesystem and process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsHost;

impl Host for OsHost {
    fn create_temp_dir(&self, root: &Path, prefix: &str) -> Result<TempDir> {
        let wrap = |source| RuntError::TempDir {
            root: root.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(root).map_err(wrap)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(root)
            .map_err(wrap)
    }

    fn current_dir(&self) -> Result<PathBuf> {
        Ok(std::env::current_dir()?)
    }

    fn change_dir(&self, dir: &Path) -> Result<()> {
        std::env::set_current_dir(dir).map_err(|source| RuntError::Chdir {
            path: dir.to_path_buf(),
            source,
        })
    }

    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    #[allow(unsafe_code)]
    fn set_var(&self, key: &str, value: &OsStr) -> Result<()> {
        validate_key(key)?;
        if value.as_encoded_bytes().contains(&0) {
            return Err(RuntError::InvalidEnvVar(format!(
                "value for {key} contains a NUL byte"
            )));
        }
        // SAFETY: test contexts run on a single call stack; callers that
        // spawn threads reading the environment must serialize themselves.
        unsafe { std::env::set_var(key, value) };
        Ok(())
    }

    #[allow(unsafe_code)]
    fn remove_var(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        // SAFETY: see `set_var`.
        unsafe { std::env::remove_var(key) };
        Ok(())
    }
}

/// `std::env` panics on these keys; report them as errors instead.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(RuntError::InvalidEnvVar("empty key".to_string()));
    }
    if key.contains('=') || key.contains('\0') {
        return Err(RuntError::InvalidEnvVar(format!(
            "key {key:?} contains '=' or a NUL byte"
        )));
    }
    Ok(())
}
