use super::RecordId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures raised by a [`RecordStore`](crate::storage::RecordStore).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{doc_type} '{id}' not found")]
    NotFound { doc_type: String, id: RecordId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl StoreError {
    pub fn not_found(doc_type: impl Into<String>, id: &RecordId) -> Self {
        Self::NotFound {
            doc_type: doc_type.into(),
            id: id.clone(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Which post-persist write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStage {
    BackReference,
    Status,
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackReference => write!(f, "back-reference"),
            Self::Status => write!(f, "status"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{doc_type} '{id}' not found")]
    NotFound { doc_type: String, id: RecordId },

    #[error("Failed to persist derived record: {0}")]
    Persistence(#[source] StoreError),

    /// The derived record exists; its back-reference or the linked status
    /// needs manual reconciliation.
    #[error("Derived record '{derived_id}' was created but the {stage} write failed: {source}")]
    PartialCascade {
        derived_id: RecordId,
        stage: CascadeStage,
        #[source]
        source: StoreError,
    },

    #[error("No derivation handler registered under '{0}'")]
    UnknownHandler(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeriveError {
    /// Identifier of a derived record that exists despite the error.
    pub fn derived_id(&self) -> Option<&RecordId> {
        match self {
            Self::PartialCascade { derived_id, .. } => Some(derived_id),
            _ => None,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type Result<T> = std::result::Result<T, DeriveError>;
