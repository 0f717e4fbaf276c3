use crate::core::{Record, RecordId, StoreResult};
use crate::storage::RecordStore;
use log::warn;

/// Outcome of the duplicate-derivation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// No back-reference: derive.
    Proceed,
    /// The source already points at a live derived record.
    Existing(RecordId),
    /// The back-reference points at a record that no longer exists: derive again.
    Stale(RecordId),
}

/// Reads the source's back-reference and decides whether derivation may run.
pub struct IdempotencyGuard<'a> {
    back_reference_field: &'a str,
    target_type: &'a str,
}

impl<'a> IdempotencyGuard<'a> {
    pub fn new(back_reference_field: &'a str, target_type: &'a str) -> Self {
        Self {
            back_reference_field,
            target_type,
        }
    }

    pub async fn check<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        source: &Record,
    ) -> StoreResult<GuardDecision> {
        let Some(derived_id) = source.reference(self.back_reference_field) else {
            return Ok(GuardDecision::Proceed);
        };

        if store.exists(self.target_type, &derived_id).await? {
            return Ok(GuardDecision::Existing(derived_id));
        }

        warn!(
            "{} '{}' references missing {} '{}' in '{}'; deriving again",
            source.doc_type, source.id, self.target_type, derived_id, self.back_reference_field
        );
        Ok(GuardDecision::Stale(derived_id))
    }
}
