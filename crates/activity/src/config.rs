//! Log location and query defaults.
//!
//! The log path is always an explicit value handed to [`crate::ActivityLog`].
//! Defaults are derived from the executable's location; an optional TOML file
//! can override them. There is no environment-variable override.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{ActivityError, ActivityResult};

/// Number of records returned by a recent-activity query unless told otherwise.
pub const DEFAULT_RECENT_LIMIT: usize = 100;

const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "activity_log.jsonl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// JSONL file records are appended to
    pub log_file: PathBuf,
    /// Default window for recent-activity queries
    pub recent_limit: usize,
}

/// On-disk shape of the optional config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    log_file: Option<PathBuf>,
    recent_limit: Option<usize>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl LogConfig {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// Reads a TOML config file and layers it over the built-in defaults.
    pub fn load(path: &Path) -> ActivityResult<Self> {
        Self::default().merge_file(path)
    }

    /// Applies the values found in `path` on top of `self`.
    ///
    /// A relative `log_file` is resolved against the directory holding the
    /// config file.
    pub fn merge_file(mut self, path: &Path) -> ActivityResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ActivityError::io(Some(path.to_path_buf()), "read config file", e)
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|e| ActivityError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(log_file) = file.log_file {
            self.log_file = if log_file.is_relative() {
                path.parent().unwrap_or(Path::new("")).join(log_file)
            } else {
                log_file
            };
        }
        if let Some(limit) = file.recent_limit {
            self.recent_limit = limit;
        }

        tracing::debug!(
            config = %path.display(),
            log_file = %self.log_file.display(),
            recent_limit = self.recent_limit,
            "configuration file applied"
        );
        Ok(self)
    }
}

/// `<install root>/logs/activity_log.jsonl`, where the install root is the
/// parent of the directory holding the running binary.
pub fn default_log_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| log_file_beside(&exe))
        .unwrap_or_else(|| Path::new(LOG_DIR).join(LOG_FILE_NAME))
}

fn log_file_beside(exe: &Path) -> Option<PathBuf> {
    let root = exe.parent()?.parent()?;
    Some(root.join(LOG_DIR).join(LOG_FILE_NAME))
}
