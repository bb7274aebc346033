//! The audit record store: validation gate in front of a storage backend.

use cairn_core::AuditConfig;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AuditError, ValidationError};
use crate::record::{AUDIT_LOG_COLLECTION, AuditRecord, PersistedRecord};
use crate::storage::{AuditStorage, MemoryStorage, create_storage};
use crate::validation::{PermissiveValidator, RecordValidator, validator_from_config};

/// Gate and sink for audit records.
#[derive(Clone)]
pub struct AuditRecordStore {
    validator: Arc<dyn RecordValidator>,
    storage: Arc<dyn AuditStorage>,
}

impl AuditRecordStore {
    /// Create a store with the permissive validator.
    pub fn new(storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            validator: Arc::new(PermissiveValidator),
            storage,
        }
    }

    /// Replace the validation policy.
    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// In-memory store, mainly for development and tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Build validator and backend from configuration.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let storage = create_storage(&config.storage)?;
        let validator = validator_from_config(&config.validation)?;

        tracing::info!(
            collection = AUDIT_LOG_COLLECTION,
            backend = storage.name(),
            validator = validator.name(),
            "Audit record store ready"
        );

        Ok(Self { validator, storage })
    }

    /// Run a candidate through the validation policy.
    pub fn validate(&self, candidate: AuditRecord) -> Result<AuditRecord, ValidationError> {
        self.validator.validate(candidate)
    }

    /// Durably write a candidate. The returned record is retrievable with
    /// [`get`](Self::get) as soon as this returns.
    pub async fn save(&self, candidate: AuditRecord) -> Result<PersistedRecord, AuditError> {
        self.storage.store(candidate).await
    }

    /// Look up a persisted record by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<PersistedRecord>, AuditError> {
        self.storage.get(id).await
    }

    pub fn storage(&self) -> &Arc<dyn AuditStorage> {
        &self.storage
    }
}
