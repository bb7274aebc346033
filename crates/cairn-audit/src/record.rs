//! Audit record types.
//!
//! An [`AuditRecord`] is the candidate built by the capture handler; a
//! [`PersistedRecord`] is what the store returns after a durable write, with
//! the store-assigned id, timestamp and sequence number. Records are never
//! updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the logical collection holding audit records.
pub const AUDIT_LOG_COLLECTION: &str = "audit_log_record";

/// A candidate audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Event class, taken from the event message.
    #[serde(rename = "type")]
    pub record_type: String,

    /// Event payload, verbatim.
    pub details: Option<serde_json::Value>,

    /// Remote address of the originating request.
    pub ip: Option<String>,

    /// Identifier of the authenticated actor.
    pub user_id: Option<String>,
}

impl AuditRecord {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            details: None,
            ip: None,
            user_id: None,
        }
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// A record after it has been written by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    /// Store-assigned identifier.
    pub id: Uuid,

    /// When the store committed the record.
    pub created_at: DateTime<Utc>,

    /// Commit position within the store, strictly increasing.
    pub sequence: u64,

    #[serde(flatten)]
    pub record: AuditRecord,
}

impl PersistedRecord {
    /// Stamp a candidate with a fresh id, the current time and `sequence`.
    pub fn assign(record: AuditRecord, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            sequence,
            record,
        }
    }

    pub fn record_type(&self) -> &str {
        &self.record.record_type
    }

    /// One-line human-readable summary for diagnostics.
    pub fn to_log_line(&self) -> String {
        format!(
            "[{}] #{} {} type={} user={} ip={}",
            self.created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.sequence,
            self.id,
            self.record.record_type,
            self.record.user_id.as_deref().unwrap_or("-"),
            self.record.ip.as_deref().unwrap_or("-"),
        )
    }
}
