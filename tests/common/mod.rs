#![allow(dead_code)]

use async_trait::async_trait;
use docderive::{
    ChildRow, DerivationConfig, DerivationEngine, InMemoryRecordStore, Record, RecordId,
    RecordStore, SourceLocks, StoreError, StoreResult, Value,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub fn user(name: &str) -> ChildRow {
    ChildRow::new().with("user", name)
}

/// Q1 → O1 (Open, users a, b, a), plus a second unrelated quotation.
pub fn scenario_records() -> Vec<Record> {
    vec![
        Record::new("Quotation", "Q1")
            .with("opportunity", "O1")
            .with("company", "ACME Ltd")
            .with("currency", "EUR")
            .with("customer", "CUST-001")
            .with("customer_name", "Globex")
            .with("grand_total", 1200.5)
            .with("transaction_date", "2026-10-01"),
        Record::new("Opportunity", "O1")
            .with("status", "Open")
            .with("title", "Warehouse rollout")
            .with("expected_closing", "2026-12-01")
            .with_child("users", user("a"))
            .with_child("users", user("b"))
            .with_child("users", user("a")),
        Record::new("Quotation", "Q2").with("opportunity", "O1"),
    ]
}

pub fn scenario_store() -> Arc<InMemoryRecordStore> {
    Arc::new(InMemoryRecordStore::with_records(scenario_records()).unwrap())
}

pub fn engine_over<S: RecordStore>(store: Arc<S>) -> DerivationEngine<S> {
    DerivationEngine::new(store, DerivationConfig::quotation_to_project()).unwrap()
}

pub async fn field(
    store: &impl RecordStore,
    doc_type: &str,
    id: &str,
    field: &str,
) -> Option<Value> {
    store
        .get(doc_type, &RecordId::from(id))
        .await
        .unwrap()
        .and_then(|record| record.get(field).cloned())
}

/// Wraps the in-memory store and injects failures on demand.
pub struct FaultyStore {
    pub inner: InMemoryRecordStore,
    pub fail_insert: AtomicBool,
    pub fail_set_field: Mutex<Option<String>>,
    pub insert_delay: Mutex<Option<Duration>>,
    pub inserts: AtomicUsize,
    pub writes: Mutex<Vec<(String, String)>>,
}

impl FaultyStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            inner: InMemoryRecordStore::with_records(records).unwrap(),
            fail_insert: AtomicBool::new(false),
            fail_set_field: Mutex::new(None),
            insert_delay: Mutex::new(None),
            inserts: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_insert(self) -> Self {
        self.fail_insert.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_write_to(self, field: &str) -> Self {
        *self.fail_set_field.lock().unwrap() = Some(field.to_string());
        self
    }

    pub fn slow_insert(self, delay: Duration) -> Self {
        *self.insert_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn get(&self, doc_type: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        self.inner.get(doc_type, id).await
    }

    async fn insert(&self, record: Record) -> StoreResult<RecordId> {
        let delay = *self.insert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
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
        let failing = self.fail_set_field.lock().unwrap().clone();
        if failing.as_deref() == Some(field) {
            return Err(StoreError::Conflict(format!("{} is locked", field)));
        }
        self.writes
            .lock()
            .unwrap()
            .push((doc_type.to_string(), field.to_string()));
        self.inner.set_value(doc_type, id, field, value).await
    }

    fn source_locks(&self) -> &SourceLocks {
        self.inner.source_locks()
    }
}
