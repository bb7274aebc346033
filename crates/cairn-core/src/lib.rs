//! Shared types for the Cairn audit workspace.
//!
//! - [`config`]: YAML configuration (`cairn.yaml`) for logging and audit capture.
//! - [`context`]: the request context (acting identity and remote address)
//!   that callers pass explicitly into the audit capture path.

// Configuration types shared across all Cairn crates
pub mod config;

pub mod context;

// Re-export commonly used types for convenience
pub use config::{
    AuditConfig, CairnConfig, ConfigError, FailureMode, LoggingConfig, StorageBackend,
    StorageConfig, ValidationConfig,
};
pub use context::{Identity, RequestContext};
