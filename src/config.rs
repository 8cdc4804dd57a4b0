//! Configuration loading and management
//!
//! Handles parsing of `.kanban.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = ".kanban.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Save file configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// View history configuration
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Save file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Save file path, relative to the config directory unless absolute
    #[serde(default = "default_storage_file")]
    pub file: String,

    /// How long to wait for the save file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_storage_file() -> String {
    "tasks.csv".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: default_storage_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// View history configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of entries kept; unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Config {
    /// Load configuration from a `.kanban.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_else(|err| {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save file location for a config living in `dir`
    pub fn storage_path(&self, dir: &Path) -> PathBuf {
        let file = Path::new(self.storage.file.trim());
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            dir.join(file)
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.storage.file.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "storage.file cannot be empty".to_string(),
            ));
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.history.limit == Some(0) {
            return Err(crate::error::Error::InvalidConfig(
                "history.limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
