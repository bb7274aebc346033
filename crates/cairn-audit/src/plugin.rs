//! Startup activation of the capture handler.

use cairn_core::AuditConfig;
use std::sync::Arc;

use crate::error::AuditError;
use crate::handler::CaptureHandler;
use crate::logger::AuditLogger;
use crate::store::AuditRecordStore;

/// Attach a [`CaptureHandler`] writing to `store` to `logger`.
///
/// Returns `None` without touching the logger when capture is disabled.
/// A logger accepts a single capture handler; activating twice fails.
pub fn activate(
    logger: &AuditLogger,
    store: AuditRecordStore,
    config: &AuditConfig,
) -> Result<Option<Arc<CaptureHandler>>, AuditError> {
    if !config.enabled {
        tracing::info!(logger = logger.name(), "Audit capture disabled");
        return Ok(None);
    }

    let handler = Arc::new(CaptureHandler::from_config(store, config));
    logger.register_unique(handler.clone())?;

    tracing::info!(
        logger = logger.name(),
        failure_mode = %config.failure_mode,
        write_timeout_ms = ?config.write_timeout_ms,
        "Audit capture activated"
    );

    Ok(Some(handler))
}

/// Create the logger named in `config`, build its store and activate capture.
pub fn init(config: &AuditConfig) -> Result<AuditLogger, AuditError> {
    let logger = AuditLogger::new(config.logger_name.clone());
    if config.enabled {
        let store = AuditRecordStore::from_config(config)?;
        activate(&logger, store, config)?;
    }
    Ok(logger)
}
