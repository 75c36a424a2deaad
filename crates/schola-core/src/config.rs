//! Engine configuration

use std::path::Path;

use serde::Deserialize;

use crate::errors::{CommandError, Result};
use crate::logging_facility::Profile;

const MAX_WORKER_THREADS: usize = 1024;

/// Tunables read from TOML; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Threads of the parallel worker pool; 0 lets rayon decide
    pub worker_threads: usize,
    pub thread_name_prefix: String,
    pub log_profile: Profile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name_prefix: "schola-worker".to_string(),
            log_profile: Profile::default(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// `Config` on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| CommandError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or parsed, or holds invalid values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no engine config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| CommandError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(CommandError::Config {
                message: "thread_name_prefix must not be empty".to_string(),
            });
        }
        if self.worker_threads > MAX_WORKER_THREADS {
            return Err(CommandError::Config {
                message: format!(
                    "worker_threads must be at most {}, got {}",
                    MAX_WORKER_THREADS, self.worker_threads
                ),
            });
        }
        Ok(())
    }
}
