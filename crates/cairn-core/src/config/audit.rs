//! Audit capture configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Configuration for audit capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit capture is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Name of the audit logger the capture handler attaches to.
    #[serde(default = "default_logger_name")]
    pub logger_name: String,

    /// What happens to the emitting call when a record cannot be written.
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// Upper bound on a single store call, in milliseconds.
    /// Unset means the emitting call waits for the store indefinitely.
    #[serde(default)]
    pub write_timeout_ms: Option<u64>,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Record validation policy.
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Behavior when validation or persistence of an audit record fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// The failure propagates to the code that emitted the event.
    #[default]
    FailClosed,
    /// The failure is logged and the emitting call proceeds.
    FailOpen,
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailClosed => write!(f, "fail_closed"),
            Self::FailOpen => write!(f, "fail_open"),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage backend type.
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path (for file backend).
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Keep records in process memory.
    #[default]
    Memory,
    /// Append records to a JSON Lines file.
    File,
}

/// Record validation policy. The defaults accept every record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// Accepted event types. Empty means any type.
    #[serde(default)]
    pub allowed_types: Vec<String>,

    /// Reject records without a remote address.
    #[serde(default)]
    pub require_ip: bool,

    /// Reject records without an authenticated user.
    #[serde(default)]
    pub require_user: bool,

    /// Path to a JSON Schema that `details` must satisfy.
    #[serde(default)]
    pub details_schema: Option<PathBuf>,
}

impl ValidationConfig {
    /// Whether every record is accepted as is.
    pub fn is_permissive(&self) -> bool {
        self.allowed_types.is_empty()
            && !self.require_ip
            && !self.require_user
            && self.details_schema.is_none()
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            logger_name: default_logger_name(),
            failure_mode: FailureMode::default(),
            write_timeout_ms: None,
            storage: StorageConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Check settings that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logger_name.trim().is_empty() {
            return Err(ConfigError::Config(
                "audit.logger_name must not be empty".to_string(),
            ));
        }
        if self.write_timeout_ms == Some(0) {
            return Err(ConfigError::Config(
                "audit.write_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::File && self.storage.file_path.is_none() {
            return Err(ConfigError::Config(
                "audit.storage.file_path is required for the file backend".to_string(),
            ));
        }
        Ok(())
    }

    /// The write timeout as a `Duration`.
    pub fn write_timeout(&self) -> Option<std::time::Duration> {
        self.write_timeout_ms.map(std::time::Duration::from_millis)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_logger_name() -> String {
    "audit".to_string()
}
