//! Audit storage backends.
//!
//! Backends assign the record id, timestamp and sequence number and make the
//! write durable before returning. They expose append and lookup by id only.

use async_trait::async_trait;
use cairn_core::config::audit::{StorageBackend, StorageConfig};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::error::AuditError;
use crate::record::{AuditRecord, PersistedRecord};

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Durably append a record and return it with its assigned identity.
    async fn store(&self, record: AuditRecord) -> Result<PersistedRecord, AuditError>;

    /// Get a record by ID.
    async fn get(&self, id: Uuid) -> Result<Option<PersistedRecord>, AuditError>;

    /// Backend name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Create a storage backend based on configuration.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn AuditStorage>, AuditError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::File => {
            let path = config.file_path.as_deref().ok_or_else(|| {
                AuditError::InitializationFailed(
                    "file storage requires storage.file_path".to_string(),
                )
            })?;
            Ok(Arc::new(FileStorage::open(path)?))
        }
    }
}

/// In-process storage. Records live as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<Vec<PersistedRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in commit order.
    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, record: AuditRecord) -> Result<PersistedRecord, AuditError> {
        let mut records = self.records.write().map_err(|e| {
            AuditError::Persistence(format!("failed to acquire write lock: {}", e))
        })?;

        let sequence = records.len() as u64 + 1;
        let persisted = PersistedRecord::assign(record, sequence);
        records.push(persisted.clone());

        Ok(persisted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PersistedRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Persistence(format!("failed to acquire read lock: {}", e))
        })?;

        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// File storage: one JSON object per line, synced to disk per record.
///
/// Opening an existing file replays it, so ids written by earlier processes
/// stay retrievable and sequence numbers continue where they stopped.
pub struct FileStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

struct FileState {
    file: File,
    index: HashMap<Uuid, PersistedRecord>,
    next_sequence: u64,
}

impl FileStorage {
    /// Open (creating if needed) the log file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let (index, next_sequence) = if path.exists() {
            Self::replay(&path)?
        } else {
            (HashMap::new(), 1)
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing::info!(
            path = %path.display(),
            records = index.len(),
            "Opened audit log file"
        );

        Ok(Self {
            path,
            state: Mutex::new(FileState {
                file,
                index,
                next_sequence,
            }),
        })
    }

    /// Rebuild the id index from an existing log.
    ///
    /// A trailing line without its newline is the remains of an interrupted
    /// append; it is truncated away. Corruption anywhere else is an error.
    fn replay(path: &Path) -> Result<(HashMap<Uuid, PersistedRecord>, u64), AuditError> {
        let bytes = std::fs::read(path)?;
        let complete_len = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        if complete_len < bytes.len() {
            tracing::warn!(
                path = %path.display(),
                bytes = bytes.len() - complete_len,
                "Truncating incomplete trailing audit record"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(complete_len as u64)?;
            file.sync_all()?;
        }

        let content = std::str::from_utf8(&bytes[..complete_len]).map_err(|e| {
            AuditError::InitializationFailed(format!("{}: not valid UTF-8: {}", path.display(), e))
        })?;

        let mut index = HashMap::new();
        let mut last_sequence = 0;

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: PersistedRecord = serde_json::from_str(line).map_err(|e| {
                AuditError::InitializationFailed(format!(
                    "{}:{}: corrupt audit record: {}",
                    path.display(),
                    line_no + 1,
                    e
                ))
            })?;
            last_sequence = last_sequence.max(record.sequence);
            index.insert(record.id, record);
        }

        Ok((index, last_sequence + 1))
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, record: AuditRecord) -> Result<PersistedRecord, AuditError> {
        let mut state = self.state.lock().map_err(|e| {
            AuditError::Persistence(format!("failed to acquire file lock: {}", e))
        })?;

        let persisted = PersistedRecord::assign(record, state.next_sequence);
        let json = serde_json::to_string(&persisted)?;

        // Bytes may reach the file even when the write reports failure, so the
        // sequence number is consumed either way.
        state.next_sequence += 1;

        let len_before = state.file.metadata()?.len();
        if let Err(e) = append_line(&mut state.file, &json) {
            if let Err(rollback) = state.file.set_len(len_before) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial audit record"
                );
            }
            return Err(AuditError::Persistence(format!(
                "write to {} failed: {}",
                self.path.display(),
                e
            )));
        }

        state.index.insert(persisted.id, persisted.clone());

        Ok(persisted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PersistedRecord>, AuditError> {
        let state = self.state.lock().map_err(|e| {
            AuditError::Persistence(format!("failed to acquire file lock: {}", e))
        })?;

        Ok(state.index.get(&id).cloned())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn append_line(file: &mut File, line: &str) -> std::io::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    file.flush()?;
    file.sync_data()
}
