//! # cairn-audit
//!
//! Audit event capture for Cairn.
//!
//! Application code emits [`AuditEvent`]s to an [`AuditLogger`] together with
//! the [`RequestContext`](cairn_core::RequestContext) it is running under. The
//! [`CaptureHandler`] registered on that logger turns each event into one
//! append-only record in the `audit_log_record` collection:
//!
//! | Field | Source |
//! |-------|--------|
//! | `type` | event message |
//! | `details` | event payload, verbatim |
//! | `ip` | request remote address, `null` outside a request |
//! | `userId` | authenticated user id, `null` when anonymous |
//!
//! The write happens inline: `emit` does not return until the record is
//! committed. In the default fail-closed mode a validation or storage failure
//! is returned from `emit`; fail-open mode logs it and lets the caller go on.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cairn_audit::{AuditEvent, AuditLogger, AuditRecordStore, AuditSink, activate};
//! use cairn_core::{AuditConfig, RequestContext};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuditConfig::default();
//! let logger = AuditLogger::new(config.logger_name.clone());
//! activate(&logger, AuditRecordStore::from_config(&config)?, &config)?;
//!
//! let ctx = RequestContext::anonymous("10.0.0.1");
//! logger
//!     .emit(&ctx, AuditEvent::new("file.download").with_details(json!({"fileId": 1})))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod logger;
pub mod plugin;
pub mod record;
pub mod storage;
pub mod store;
pub mod validation;

pub use error::{AuditError, ValidationError};
pub use event::AuditEvent;
pub use handler::{AuditHandler, CaptureHandler};
pub use logger::{AuditLogger, AuditSink};
pub use plugin::{activate, init};
pub use record::{AUDIT_LOG_COLLECTION, AuditRecord, PersistedRecord};
pub use storage::{AuditStorage, FileStorage, MemoryStorage, create_storage};
pub use store::AuditRecordStore;
pub use validation::{
    EventTypeAllowlist, JsonSchemaValidator, PermissiveValidator, RecordValidator, RequireField,
    ValidatorChain,
};
