//! Runtime configuration
//!
//! Settings come from an optional TOML file, then environment variables, then
//! explicit overrides from the caller (usually CLI flags).

use crate::ingest::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DATA_FILE: &str = "DATA_FILE_PATH";
pub const ENV_BATCH_SIZE: &str = "INGEST_BATCH_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_database_url() -> String {
    "sqlite://synheart-store.db".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/complete_clinical_trial.json")
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            batch_size: default_batch_size(),
            data_file: default_data_file(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            log_filter: default_log_filter(),
        }
    }
}

/// Values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub batch_size: Option<usize>,
    pub data_file: Option<PathBuf>,
}

impl StoreConfig {
    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: StoreConfig = toml::from_str(content)?;
        cfg.validate()
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Resolve the full layering: file (if any), process environment, overrides
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())?
            .with_overrides(overrides)
            .validate()
    }

    /// Apply environment variables read through `lookup`
    ///
    /// Blank values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = read(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(file) = read(ENV_DATA_FILE) {
            self.data_file = PathBuf::from(file);
        }
        if let Some(size) = read(ENV_BATCH_SIZE) {
            self.batch_size = size.parse().map_err(|e| ConfigError::Invalid {
                key: ENV_BATCH_SIZE.to_string(),
                reason: format!("{}: {}", size, e),
            })?;
        }
        Ok(self)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.database_url {
            self.database_url = url;
        }
        if let Some(size) = overrides.batch_size {
            self.batch_size = size;
        }
        if let Some(file) = overrides.data_file {
            self.data_file = file;
        }
        self
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "batch_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(self)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}
