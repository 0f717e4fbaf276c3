use super::locks::SourceLocks;
use crate::core::{ChildRow, Record, RecordId, StoreResult, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage contract the derivation engine depends on - allows pluggable backends
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read of a record by type and identifier
    async fn get(&self, doc_type: &str, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Check whether a record exists
    async fn exists(&self, doc_type: &str, id: &RecordId) -> StoreResult<bool> {
        Ok(self.get(doc_type, id).await?.is_some())
    }

    /// Persist a new record, assigning an identifier when it has none
    async fn insert(&self, record: Record) -> StoreResult<RecordId>;

    /// Child rows of one nested collection, scoped by parent type and identifier.
    /// Callers must not rely on any particular ordering.
    async fn child_rows(
        &self,
        parent_type: &str,
        parent_id: &RecordId,
        collection: &str,
    ) -> StoreResult<Vec<ChildRow>>;

    /// Atomic single-attribute update
    async fn set_value(
        &self,
        doc_type: &str,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> StoreResult<()>;

    /// Per-record locks shared by every caller of this store
    fn source_locks(&self) -> &SourceLocks;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn get(&self, doc_type: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        (**self).get(doc_type, id).await
    }

    async fn exists(&self, doc_type: &str, id: &RecordId) -> StoreResult<bool> {
        (**self).exists(doc_type, id).await
    }

    async fn insert(&self, record: Record) -> StoreResult<RecordId> {
        (**self).insert(record).await
    }

    async fn child_rows(
        &self,
        parent_type: &str,
        parent_id: &RecordId,
        collection: &str,
    ) -> StoreResult<Vec<ChildRow>> {
        (**self).child_rows(parent_type, parent_id, collection).await
    }

    async fn set_value(
        &self,
        doc_type: &str,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        (**self).set_value(doc_type, id, field, value).await
    }

    fn source_locks(&self) -> &SourceLocks {
        (**self).source_locks()
    }
}
