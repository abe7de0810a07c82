#![forbid(unsafe_code)]

//! Runtime configuration for the history and settings services.
//!
//! # Loading
//!
//! ```toml
//! # subdash.toml
//! [history]
//! max_depth = 100
//!
//! [settings]
//! storage_key = "subscription-dashboard-settings"
//! storage_dir = "~/.local/share/subdash"
//! ```
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_toml_file("subdash.toml")?;
//! let config = RuntimeConfig::from_json_str(json)?;
//! ```
//!
//! Every section is optional; `RuntimeConfig::default()` gives an unbounded
//! history and in-memory settings under the default key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::DEFAULT_STORAGE_KEY;
use crate::undo::HistoryConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub history: HistoryConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Key the settings blob is stored under.
    pub storage_key: String,
    /// Directory for file-backed storage. `None` keeps settings in memory.
    pub storage_dir: Option<PathBuf>,
    /// Per-value limit for in-memory storage.
    pub quota_bytes: Option<usize>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            storage_dir: None,
            quota_bytes: None,
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Check parameters are usable. Empty list means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history.max_depth == Some(0) {
            errors.push("history.max_depth must be at least 1".to_owned());
        }
        if self.settings.storage_key.trim().is_empty() {
            errors.push("settings.storage_key must not be empty".to_owned());
        }
        if self.settings.quota_bytes == Some(0) {
            errors.push("settings.quota_bytes must be at least 1".to_owned());
        }
        if self.settings.storage_dir.is_some() && !cfg!(feature = "file-storage") {
            errors.push("settings.storage_dir requires the `file-storage` feature".to_owned());
        }
        errors
    }

    /// [`Self::validate`] as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
