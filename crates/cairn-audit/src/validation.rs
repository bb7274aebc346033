//! Record validation policies.
//!
//! The store runs every candidate through a [`RecordValidator`] before
//! writing it. The default [`PermissiveValidator`] accepts any record;
//! stricter rules are added by composing validators in a [`ValidatorChain`].

use cairn_core::ValidationConfig;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{AuditError, ValidationError};
use crate::record::AuditRecord;

/// Validation gate applied to every candidate record.
pub trait RecordValidator: Send + Sync {
    /// Accept (possibly normalizing) or reject a candidate.
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError>;

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Accepts every record unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl RecordValidator for PermissiveValidator {
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError> {
        Ok(record)
    }

    fn name(&self) -> &'static str {
        "permissive"
    }
}

/// Accepts only records whose `type` is in the allowlist.
#[derive(Debug, Clone)]
pub struct EventTypeAllowlist {
    allowed: HashSet<String>,
}

impl EventTypeAllowlist {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl RecordValidator for EventTypeAllowlist {
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError> {
        if self.allowed.contains(&record.record_type) {
            Ok(record)
        } else {
            Err(ValidationError::new(
                "type",
                format!("event type '{}' is not allowed", record.record_type),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "event_type_allowlist"
    }
}

/// Rejects records where an optional field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireField {
    Ip,
    UserId,
    Details,
}

impl RecordValidator for RequireField {
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError> {
        let (field, present) = match self {
            Self::Ip => ("ip", record.ip.is_some()),
            Self::UserId => ("userId", record.user_id.is_some()),
            Self::Details => ("details", record.details.is_some()),
        };

        if present {
            Ok(record)
        } else {
            Err(ValidationError::new(field, "field is required"))
        }
    }

    fn name(&self) -> &'static str {
        "require_field"
    }
}

/// Validates `details` against a JSON Schema (draft 2020-12).
///
/// Records without details are accepted; combine with
/// [`RequireField::Details`] to make the payload mandatory.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compile a schema.
    pub fn new(schema: &serde_json::Value) -> Result<Self, AuditError> {
        let validator = jsonschema::draft202012::options()
            .build(schema)
            .map_err(|e| AuditError::InitializationFailed(format!("invalid details schema: {e}")))?;
        Ok(Self { validator })
    }

    /// Read and compile a schema file.
    pub fn from_file(path: &Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path)?;
        let schema: serde_json::Value = serde_json::from_str(&content)?;
        Self::new(&schema)
    }
}

impl RecordValidator for JsonSchemaValidator {
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError> {
        let Some(details) = &record.details else {
            return Ok(record);
        };

        let errors: Vec<String> = self
            .validator
            .iter_errors(details)
            .take(5)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError::new("details", errors.join("; ")))
        }
    }

    fn name(&self) -> &'static str {
        "json_schema"
    }
}

/// Applies validators in order; the first rejection wins.
#[derive(Clone, Default)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn RecordValidator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator.
    pub fn with(mut self, validator: impl RecordValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Build the chain described by the configuration.
    pub fn from_config(config: &ValidationConfig) -> Result<Self, AuditError> {
        let mut chain = Self::new();

        if !config.allowed_types.is_empty() {
            chain = chain.with(EventTypeAllowlist::new(config.allowed_types.iter().cloned()));
        }
        if config.require_ip {
            chain = chain.with(RequireField::Ip);
        }
        if config.require_user {
            chain = chain.with(RequireField::UserId);
        }
        if let Some(path) = &config.details_schema {
            chain = chain.with(JsonSchemaValidator::from_file(path)?);
        }

        Ok(chain)
    }
}

impl RecordValidator for ValidatorChain {
    fn validate(&self, record: AuditRecord) -> Result<AuditRecord, ValidationError> {
        self.validators
            .iter()
            .try_fold(record, |record, validator| validator.validate(record))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

/// Build the validator for a configuration: permissive unless a rule is set.
pub fn validator_from_config(
    config: &ValidationConfig,
) -> Result<Arc<dyn RecordValidator>, AuditError> {
    if config.is_permissive() {
        Ok(Arc::new(PermissiveValidator))
    } else {
        Ok(Arc::new(ValidatorChain::from_config(config)?))
    }
}
