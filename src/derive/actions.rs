use super::guard::{GuardDecision, IdempotencyGuard};
use crate::config::DerivationConfig;
use crate::core::{DeriveError, RecordId, Result};
use crate::storage::RecordStore;
use serde::Serialize;

/// What a source record's view should offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleActions {
    /// Show the "derive" action.
    pub can_derive: bool,
    /// Existing derived record to link to instead.
    pub derived_id: Option<RecordId>,
}

/// Recomputes the visible actions of a source record from stored state.
///
/// Read-only and idempotent; call it on every change event that touches the
/// source record or its derived record.
pub async fn reconcile_actions<S: RecordStore + ?Sized>(
    store: &S,
    config: &DerivationConfig,
    source_id: &RecordId,
) -> Result<VisibleActions> {
    let source = store
        .get(&config.source_type, source_id)
        .await
        .map_err(DeriveError::Persistence)?
        .ok_or_else(|| DeriveError::NotFound {
            doc_type: config.source_type.clone(),
            id: source_id.clone(),
        })?;

    let decision = IdempotencyGuard::new(&config.back_reference_field, &config.target_type)
        .check(store, &source)
        .await
        .map_err(DeriveError::Persistence)?;

    Ok(match decision {
        GuardDecision::Existing(derived_id) => VisibleActions {
            can_derive: false,
            derived_id: Some(derived_id),
        },
        GuardDecision::Proceed | GuardDecision::Stale(_) => VisibleActions {
            can_derive: !config.linked_required || source.reference(&config.link_field).is_some(),
            derived_id: None,
        },
    })
}
