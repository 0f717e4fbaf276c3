use crate::core::{RecordId, StoreError, StoreResult, Value};
use crate::storage::RecordStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CascadeOutcome {
    /// Status moved to the terminal value.
    Transitioned { from: Value },
    /// Status was already terminal; nothing written.
    AlreadyTerminal,
    /// No linked record to cascade to.
    Skipped,
}

/// Moves the linked record's status to its terminal value, at most once.
pub struct StatusCascader<'a> {
    status_field: &'a str,
    terminal: &'a Value,
}

impl<'a> StatusCascader<'a> {
    pub fn new(status_field: &'a str, terminal: &'a Value) -> Self {
        Self {
            status_field,
            terminal,
        }
    }

    /// Only `status_field` of the linked record is ever written.
    pub async fn cascade<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        linked_type: &str,
        linked_id: &RecordId,
    ) -> StoreResult<CascadeOutcome> {
        let linked = store
            .get(linked_type, linked_id)
            .await?
            .ok_or_else(|| StoreError::not_found(linked_type, linked_id))?;
        let current = linked.get(self.status_field).cloned().unwrap_or_default();

        if current == *self.terminal {
            return Ok(CascadeOutcome::AlreadyTerminal);
        }

        store
            .set_value(linked_type, linked_id, self.status_field, self.terminal.clone())
            .await?;
        Ok(CascadeOutcome::Transitioned { from: current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::storage::InMemoryRecordStore;

    #[tokio::test]
    async fn test_cascade_transitions_once() {
        let store = InMemoryRecordStore::with_records([Record::new("Opportunity", "O1")
            .with("status", "Open")])
        .unwrap();
        let terminal = Value::from("Converted");
        let cascader = StatusCascader::new("status", &terminal);
        let id = RecordId::from("O1");

        let first = cascader.cascade(&store, "Opportunity", &id).await.unwrap();
        assert_eq!(
            first,
            CascadeOutcome::Transitioned {
                from: Value::from("Open")
            }
        );

        let second = cascader.cascade(&store, "Opportunity", &id).await.unwrap();
        assert_eq!(second, CascadeOutcome::AlreadyTerminal);

        let record = store.get("Opportunity", &id).await.unwrap().unwrap();
        assert_eq!(record.get("status"), Some(&terminal));
    }

    #[tokio::test]
    async fn test_cascade_missing_linked_record() {
        let store = InMemoryRecordStore::new();
        let terminal = Value::from("Converted");
        let err = StatusCascader::new("status", &terminal)
            .cascade(&store, "Opportunity", &RecordId::from("O1"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
