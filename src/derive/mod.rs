//! Document derivation: builds a derived record from a source record and the
//! record it links to.
//!
//! The pieces run in a fixed order, driven by [`DerivationEngine`]:
//! [`IdempotencyGuard`] → [`FieldMapper`] → [`ChildCollectionAggregator`] →
//! persist → back-reference → [`StatusCascader`].

pub mod actions;
pub mod aggregator;
pub mod cascade;
pub mod guard;
pub mod mapper;
pub mod orchestrator;
pub mod rules;

pub use actions::{VisibleActions, reconcile_actions};
pub use aggregator::{ChildCollectionAggregator, MergeReport};
pub use cascade::{CascadeOutcome, StatusCascader};
pub use guard::{GuardDecision, IdempotencyGuard};
pub use mapper::FieldMapper;
pub use orchestrator::{Derivation, DerivationEngine};
pub use rules::{CollectionMerge, FallbackChain, FieldRef, MappingRuleSet, Origin, RenameRule};
