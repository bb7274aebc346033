//! Audit capture handler.
//!
//! [`CaptureHandler`] is registered on the [`AuditLogger`](crate::AuditLogger)
//! and turns every dispatched event into exactly one persisted record. It
//! runs inline on the emitting task; the emitting call does not resume until
//! the record is committed or the failure has been handled.

use async_trait::async_trait;
use cairn_core::{AuditConfig, FailureMode, RequestContext};
use std::time::Duration;

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::record::{AuditRecord, PersistedRecord};
use crate::store::AuditRecordStore;

/// A listener attached to an audit logger.
#[async_trait]
pub trait AuditHandler: Send + Sync {
    /// Process one event emitted under `ctx`.
    async fn handle(&self, ctx: &RequestContext, event: &AuditEvent) -> Result<(), AuditError>;

    /// Handler name, unique per logger by convention.
    fn name(&self) -> &str;
}

/// Writes one audit record per event through an [`AuditRecordStore`].
pub struct CaptureHandler {
    store: AuditRecordStore,
    failure_mode: FailureMode,
    write_timeout: Option<Duration>,
}

impl CaptureHandler {
    pub const NAME: &'static str = "audit_log_record";

    /// Create a fail-closed handler without a write timeout.
    pub fn new(store: AuditRecordStore) -> Self {
        Self {
            store,
            failure_mode: FailureMode::FailClosed,
            write_timeout: None,
        }
    }

    /// Create a handler with the failure mode and timeout from configuration.
    pub fn from_config(store: AuditRecordStore, config: &AuditConfig) -> Self {
        Self {
            store,
            failure_mode: config.failure_mode,
            write_timeout: config.write_timeout(),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// Build the candidate record for `event`.
    ///
    /// Missing identity or request resolves to `None`; this never fails.
    pub fn build_record(ctx: &RequestContext, event: &AuditEvent) -> AuditRecord {
        AuditRecord {
            record_type: event.message.clone(),
            details: event.details.clone(),
            ip: ctx.remote_address().map(str::to_string),
            user_id: ctx.current_user().map(|user| user.id.clone()),
        }
    }

    /// Validate and save the record for `event`, ignoring the failure mode.
    ///
    /// With a write timeout the save runs on the blocking pool, so a backend
    /// that blocks its thread still times out. The abandoned write may finish
    /// later; the caller has already been told it failed.
    pub async fn capture(
        &self,
        ctx: &RequestContext,
        event: &AuditEvent,
    ) -> Result<PersistedRecord, AuditError> {
        let candidate = self.store.validate(Self::build_record(ctx, event))?;

        let Some(limit) = self.write_timeout else {
            return self.store.save(candidate).await;
        };

        let store = self.store.clone();
        let runtime = tokio::runtime::Handle::current();
        let write = tokio::task::spawn_blocking(move || runtime.block_on(store.save(candidate)));

        match tokio::time::timeout(limit, write).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AuditError::Internal(anyhow::anyhow!(
                "audit write task failed: {}",
                e
            ))),
            Err(_) => Err(AuditError::Timeout(limit)),
        }
    }
}

#[async_trait]
impl AuditHandler for CaptureHandler {
    async fn handle(&self, ctx: &RequestContext, event: &AuditEvent) -> Result<(), AuditError> {
        match self.capture(ctx, event).await {
            Ok(record) => {
                tracing::debug!(
                    record_id = %record.id,
                    sequence = record.sequence,
                    line = %record.to_log_line(),
                    "Audit record written"
                );
                Ok(())
            }
            Err(e) => match self.failure_mode {
                FailureMode::FailClosed => Err(e),
                FailureMode::FailOpen => {
                    tracing::error!(
                        error = %e,
                        event_type = %event.message,
                        "Audit record dropped"
                    );
                    Ok(())
                }
            },
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
