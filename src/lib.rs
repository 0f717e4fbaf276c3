// ============================================================================
// docderive Library
// ============================================================================

pub mod config;
pub mod core;
pub mod derive;
pub mod prelude;
pub mod registry;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use config::DerivationConfig;
pub use crate::core::{
    CascadeStage, ChildRow, DeriveError, Record, RecordId, Result, StoreError, StoreResult, Value,
};
pub use derive::{
    CascadeOutcome, CollectionMerge, Derivation, DerivationEngine, FieldRef, MappingRuleSet,
    VisibleActions, reconcile_actions,
};
pub use registry::{DerivationHandler, DerivationRegistry, FnHandler};
pub use storage::{
    DurableRecordStore, InMemoryRecordStore, RecordStore, SnapshotFile, SourceLocks,
};

/// Open an engine over a fresh in-memory store seeded with `records`.
///
/// # Examples
///
/// ```
/// use docderive::{DerivationConfig, Record, RecordId, ChildRow};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = docderive::open_in_memory(
///     DerivationConfig::quotation_to_project(),
///     vec![
///         Record::new("Quotation", "Q1").with("opportunity", "O1"),
///         Record::new("Opportunity", "O1")
///             .with("status", "Open")
///             .with_child("users", ChildRow::new().with("user", "a")),
///     ],
/// )?;
///
/// let project = engine.derive_record(&RecordId::from("Q1")).await?;
/// assert_eq!(engine.derive_record(&RecordId::from("Q1")).await?, project);
/// # Ok(())
/// # }
/// ```
pub fn open_in_memory(
    config: DerivationConfig,
    records: impl IntoIterator<Item = Record>,
) -> Result<DerivationEngine<InMemoryRecordStore>> {
    let store = InMemoryRecordStore::with_records(records).map_err(DeriveError::Persistence)?;
    DerivationEngine::new(std::sync::Arc::new(store), config)
}
