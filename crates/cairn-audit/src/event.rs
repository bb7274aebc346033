//! Audit events emitted by application code.

use serde::{Deserialize, Serialize};

/// An event emitted through the audit logger.
///
/// `message` names the event class (e.g. `file.download`) and becomes the
/// record's `type`. `details` is the event-specific payload, copied verbatim
/// into the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event class.
    pub message: String,

    /// Structured payload, schema-free.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create an event without details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Attach the structured payload. A JSON `null` counts as no payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = if details.is_null() { None } else { Some(details) };
        self
    }
}
