//! Snapshot persistence for the in-memory record store

use crate::core::{ChildRow, Record, RecordId, StoreResult, Value};
use crate::storage::engine::RecordStore;
use crate::storage::locks::SourceLocks;
use crate::storage::memory::InMemoryRecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub records: Vec<Record>,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
}

impl StoreSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        let record_count = records.len();
        Self {
            version: SNAPSHOT_VERSION,
            records,
            metadata: SnapshotMetadata {
                created_at: Utc::now(),
                record_count,
            },
        }
    }

    pub async fn capture(store: &InMemoryRecordStore) -> Self {
        Self::new(store.all_records().await)
    }
}

// ============================================================================
// Snapshot File
// ============================================================================

/// JSON snapshot on disk, replaced atomically on every save.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("tmp");
        let temp_file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(temp_file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        writer.get_mut().sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub fn load(&self) -> StoreResult<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&data)?;
        Ok(Some(snapshot))
    }

    /// Load the snapshot into a fresh store; an absent file yields an empty store.
    pub fn open_store(&self) -> StoreResult<InMemoryRecordStore> {
        match self.load()? {
            Some(snapshot) => InMemoryRecordStore::with_records(snapshot.records),
            None => Ok(InMemoryRecordStore::new()),
        }
    }

    pub async fn save_store(&self, store: &InMemoryRecordStore) -> StoreResult<()> {
        self.save(&StoreSnapshot::capture(store).await)
    }
}

// ============================================================================
// Durable Store
// ============================================================================

/// In-memory store that rewrites its snapshot file after every mutation.
///
/// Saves are serialized, so a slower save never overwrites a newer snapshot.
/// An insert whose snapshot cannot be written is removed again and reported
/// as an error.
pub struct DurableRecordStore {
    inner: InMemoryRecordStore,
    file: SnapshotFile,
    save_lock: Mutex<()>,
}

impl DurableRecordStore {
    /// Open the store from `file`; an absent file starts empty.
    pub fn open(file: SnapshotFile) -> StoreResult<Self> {
        Ok(Self {
            inner: file.open_store()?,
            file,
            save_lock: Mutex::new(()),
        })
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    pub fn file(&self) -> &SnapshotFile {
        &self.file
    }

    /// Write the current contents to the snapshot file.
    pub async fn flush(&self) -> StoreResult<()> {
        let _saving = self.save_lock.lock().await;
        self.file.save_store(&self.inner).await
    }
}

#[async_trait]
impl RecordStore for DurableRecordStore {
    async fn get(&self, doc_type: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        self.inner.get(doc_type, id).await
    }

    async fn exists(&self, doc_type: &str, id: &RecordId) -> StoreResult<bool> {
        self.inner.exists(doc_type, id).await
    }

    async fn insert(&self, record: Record) -> StoreResult<RecordId> {
        let doc_type = record.doc_type.clone();
        let id = self.inner.insert(record).await?;
        if let Err(err) = self.flush().await {
            error!("snapshot save failed after inserting {} '{}': {}", doc_type, id, err);
            self.inner.remove(&doc_type, &id).await;
            return Err(err);
        }
        Ok(id)
    }

    async fn child_rows(
        &self,
        parent_type: &str,
        parent_id: &RecordId,
        collection: &str,
    ) -> StoreResult<Vec<ChildRow>> {
        self.inner.child_rows(parent_type, parent_id, collection).await
    }

    async fn set_value(
        &self,
        doc_type: &str,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.inner.set_value(doc_type, id, field, value).await?;
        self.flush().await
    }

    fn source_locks(&self) -> &SourceLocks {
        self.inner.source_locks()
    }
}
