//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` covers hosting the engine; `advanced` exposes the individual
//! derivation steps for callers that compose their own pipeline.

pub mod dx {
    //! Stable high-level surface: configure, open, derive.
    pub use crate::{
        DerivationConfig, DerivationEngine, DerivationRegistry, DeriveError, InMemoryRecordStore,
        Record, RecordId, RecordStore, Value, open_in_memory,
    };
}

pub mod advanced {
    //! Escape hatch for the individual derivation steps.
    pub use crate::derive::{
        ChildCollectionAggregator, FieldMapper, GuardDecision, IdempotencyGuard, StatusCascader,
    };
    pub use crate::storage::SourceLocks;
    pub use crate::storage::persistence::StoreSnapshot;
}
