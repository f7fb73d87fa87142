use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntError};

/// Project-level config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "runt.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub temp: TempConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl HarnessConfig {
    /// Load config from an explicit file (or `RUNT_CONFIG`), otherwise from the
    /// global and project files layered in that order. Env overrides apply last.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("RUNT_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_root.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Parse a config document, filling anything missing with defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| RuntError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("runt/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RuntError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RuntError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.temp {
            self.temp.merge(patch);
        }
        if let Some(patch) = patch.diagnostics {
            self.diagnostics.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("RUNT_TEMP_PREFIX") {
            self.temp.prefix = value;
        }
        if let Some(value) = env_string("RUNT_TEMP_ROOT") {
            self.temp.root = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        if let Some(value) = env_bool("RUNT_TEMP_KEEP")? {
            self.temp.keep = value;
        }
        if let Some(value) = env_bool("RUNT_CAPTURE_TRACES")? {
            self.diagnostics.capture_traces = value;
        }
        if let Some(value) = env_bool("RUNT_ECHO_LOGS")? {
            self.diagnostics.echo_logs = value;
        }
        Ok(())
    }
}

/// Where and how `temp_dir` creates directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempConfig {
    pub prefix: String,
    /// Parent directory for temp dirs; the OS temp dir when unset.
    pub root: Option<PathBuf>,
    /// Leave directories on disk instead of removing them at cleanup.
    pub keep: bool,
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            prefix: "runt-".to_string(),
            root: None,
            keep: false,
        }
    }
}

impl TempConfig {
    fn merge(&mut self, patch: TempPatch) {
        if let Some(value) = patch.prefix {
            self.prefix = value;
        }
        if let Some(value) = patch.root {
            self.root = Some(value);
        }
        if let Some(value) = patch.keep {
            self.keep = value;
        }
    }

    /// Resolved parent directory for new temp dirs.
    #[must_use]
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Capture a backtrace for panics whose payload is not a message.
    pub capture_traces: bool,
    /// Mirror every test log line as a `tracing` event.
    pub echo_logs: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            capture_traces: true,
            echo_logs: false,
        }
    }
}

impl DiagnosticsConfig {
    fn merge(&mut self, patch: DiagnosticsPatch) {
        if let Some(value) = patch.capture_traces {
            self.capture_traces = value;
        }
        if let Some(value) = patch.echo_logs {
            self.echo_logs = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub temp: Option<TempPatch>,
    pub diagnostics: Option<DiagnosticsPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TempPatch {
    pub prefix: Option<String>,
    pub root: Option<PathBuf>,
    pub keep: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DiagnosticsPatch {
    pub capture_traces: Option<bool>,
    pub echo_logs: Option<bool>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(value) => parse_bool(&value).map(Some).ok_or_else(|| {
            RuntError::Config(format!("invalid {key} value {value} (expected a boolean)"))
        }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
