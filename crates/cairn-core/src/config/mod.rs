//! Configuration types for Cairn.
//!
//! Configuration is loaded from a single YAML file (conventionally
//! `cairn.yaml`). Every section is optional; a missing file section falls
//! back to its defaults.
//!
//! ```yaml
//! logging:
//!   level: debug
//! audit:
//!   failure_mode: fail_open
//!   storage:
//!     backend: file
//!     file_path: audit_log_record.jsonl
//! ```

pub mod audit;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::{AuditConfig, FailureMode, StorageBackend, StorageConfig, ValidationConfig};

/// Complete Cairn configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CairnConfig {
    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit capture configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CairnConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration, resolve relative paths against the file's
    /// directory and validate the result.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(file_path) = &config.audit.storage.file_path {
            config.audit.storage.file_path = Some(resolve(&base_dir, file_path));
        }
        if let Some(schema) = &config.audit.validation.details_schema {
            config.audit.validation.details_schema = Some(resolve(&base_dir, schema));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audit.validate()
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
