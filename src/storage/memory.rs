use super::engine::RecordStore;
use super::locks::SourceLocks;
use crate::core::{ChildRow, Record, RecordId, StoreError, StoreResult, Value};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

type Table = HashMap<RecordId, Record>;

/// Reference store: one table per record type, guarded by a single async lock.
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
    locks: SourceLocks,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            locks: SourceLocks::new(),
        }
    }

    /// Build a store pre-populated with the given records.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> StoreResult<Self> {
        let mut tables: HashMap<String, Table> = HashMap::new();
        for record in records {
            if record.id.is_empty() {
                return Err(StoreError::Conflict(format!(
                    "{} record without an identifier",
                    record.doc_type
                )));
            }
            tables
                .entry(record.doc_type.clone())
                .or_default()
                .insert(record.id.clone(), record);
        }
        Ok(Self {
            tables: RwLock::new(tables),
            locks: SourceLocks::new(),
        })
    }

    /// Количество записей указанного типа
    pub async fn count(&self, doc_type: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(doc_type).map(HashMap::len).unwrap_or(0)
    }

    /// Remove a record; returns whether it existed
    pub async fn remove(&self, doc_type: &str, id: &RecordId) -> bool {
        let mut tables = self.tables.write().await;
        tables
            .get_mut(doc_type)
            .map(|table| table.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Every record in the store (for snapshots)
    pub async fn all_records(&self) -> Vec<Record> {
        let tables = self.tables.read().await;
        let mut records: Vec<Record> = tables
            .values()
            .flat_map(|table| table.values().cloned())
            .collect();
        records.sort_by(|a, b| (&a.doc_type, &a.id).cmp(&(&b.doc_type, &b.id)));
        records
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, doc_type: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.get(doc_type).and_then(|table| table.get(id)).cloned())
    }

    async fn exists(&self, doc_type: &str, id: &RecordId) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(doc_type)
            .is_some_and(|table| table.contains_key(id)))
    }

    async fn insert(&self, mut record: Record) -> StoreResult<RecordId> {
        if record.id.is_empty() {
            record.id = RecordId::generate();
        }
        let mut tables = self.tables.write().await;
        let table = tables.entry(record.doc_type.clone()).or_default();
        if table.contains_key(&record.id) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already exists",
                record.doc_type, record.id
            )));
        }
        let id = record.id.clone();
        table.insert(id.clone(), record);
        Ok(id)
    }

    async fn child_rows(
        &self,
        parent_type: &str,
        parent_id: &RecordId,
        collection: &str,
    ) -> StoreResult<Vec<ChildRow>> {
        let tables = self.tables.read().await;
        let parent = tables
            .get(parent_type)
            .and_then(|table| table.get(parent_id))
            .ok_or_else(|| StoreError::not_found(parent_type, parent_id))?;
        Ok(parent.collection(collection).to_vec())
    }

    async fn set_value(
        &self,
        doc_type: &str,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let record = tables
            .get_mut(doc_type)
            .and_then(|table| table.get_mut(id))
            .ok_or_else(|| StoreError::not_found(doc_type, id))?;
        record.fields.insert(field.to_string(), value);
        record.modified_at = Utc::now();
        Ok(())
    }

    fn source_locks(&self) -> &SourceLocks {
        &self.locks
    }
}
