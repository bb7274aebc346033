//! Error types for the audit crate.

use std::time::Duration;
use thiserror::Error;

/// A candidate record was rejected by the store's validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Record field the rule applies to (`type`, `details`, `ip`, `userId`).
    pub field: String,
    /// What the rule expected.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to initialize storage or attach the capture handler.
    #[error("failed to initialize audit capture: {0}")]
    InitializationFailed(String),

    /// The record was rejected by the validation policy.
    #[error("audit record rejected: {0}")]
    Validation(#[from] ValidationError),

    /// The durable write failed.
    #[error("failed to persist audit record: {0}")]
    Persistence(String),

    /// The store did not finish within the configured write timeout.
    #[error("audit record write timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuditError {
    /// Whether the error came from the validation gate.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
