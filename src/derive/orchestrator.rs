use super::aggregator::ChildCollectionAggregator;
use super::cascade::{CascadeOutcome, StatusCascader};
use super::guard::{GuardDecision, IdempotencyGuard};
use super::mapper::FieldMapper;
use crate::config::DerivationConfig;
use crate::core::{CascadeStage, DeriveError, Record, RecordId, Result, StoreError, Value};
use crate::storage::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Result of one derivation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derivation {
    pub derived_id: RecordId,
    /// `false` when an existing derived record was returned.
    pub created: bool,
    pub cascade: CascadeOutcome,
}

/// Entry point of the engine: builds one derived record per source record.
///
/// Concurrent calls for the same source are serialized through the store's
/// [`SourceLocks`](crate::storage::SourceLocks), so clones and separately built
/// engines over one store never derive a source twice.
pub struct DerivationEngine<S> {
    store: Arc<S>,
    config: Arc<DerivationConfig>,
}

impl<S> Clone for DerivationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: RecordStore> DerivationEngine<S> {
    pub fn new(store: Arc<S>, config: DerivationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &DerivationConfig {
        &self.config
    }

    /// Derive and return only the derived record's identifier.
    pub async fn derive_record(&self, source_id: &RecordId) -> Result<RecordId> {
        Ok(self.derive(source_id).await?.derived_id)
    }

    /// Runs the full derivation for one source record.
    ///
    /// Nothing is written before the derived record is persisted. Once it is,
    /// failures of the back-reference or status write are reported as
    /// [`DeriveError::PartialCascade`] and the derived record is kept.
    pub async fn derive(&self, source_id: &RecordId) -> Result<Derivation> {
        let span = info_span!(
            "derive",
            source_type = %self.config.source_type,
            source_id = %source_id,
            target_type = %self.config.target_type
        );
        self.derive_locked(source_id).instrument(span).await
    }

    async fn derive_locked(&self, source_id: &RecordId) -> Result<Derivation> {
        let config = &*self.config;
        let _permit = self
            .store
            .source_locks()
            .acquire(&config.source_type, source_id)
            .await
            .map_err(DeriveError::Persistence)?;

        // 1. Source and its linked record
        let source = self
            .store
            .get(&config.source_type, source_id)
            .await
            .map_err(DeriveError::Persistence)?
            .ok_or_else(|| DeriveError::NotFound {
                doc_type: config.source_type.clone(),
                id: source_id.clone(),
            })?;
        let linked = self.resolve_linked(&source).await?;

        // 2. Duplicate guard
        let decision = IdempotencyGuard::new(&config.back_reference_field, &config.target_type)
            .check(&*self.store, &source)
            .await
            .map_err(DeriveError::Persistence)?;
        if let GuardDecision::Existing(derived_id) = decision {
            event!(Level::INFO, derived_id = %derived_id, "derived record already exists");
            return Ok(Derivation {
                derived_id,
                created: false,
                cascade: CascadeOutcome::Skipped,
            });
        }

        // 3. Draft
        let mut draft = FieldMapper::new(&config.rules)
            .link_source_as(config.source_link_field.as_deref())
            .link_linked_as(config.linked_link_field.as_deref())
            .build_draft(&source, linked.as_ref(), &config.target_type);

        // 4. Child collections
        if let Some(linked) = &linked {
            for merge in &config.rules.merges {
                ChildCollectionAggregator::merge(
                    &*self.store,
                    &config.linked_type,
                    &linked.id,
                    merge,
                    &mut draft,
                )
                .await
                .map_err(DeriveError::Persistence)?;
            }
        }

        // 5. Persist
        let derived_id = self.persist(draft).await.map_err(|err| {
            event!(Level::ERROR, error = %err, "derived record persist failed");
            DeriveError::Persistence(err)
        })?;
        event!(Level::INFO, derived_id = %derived_id, "derived record persisted");

        // 6. Back-reference
        self.store
            .set_value(
                &config.source_type,
                source_id,
                &config.back_reference_field,
                Value::from(&derived_id),
            )
            .await
            .map_err(|err| partial(&derived_id, CascadeStage::BackReference, err))?;

        // 7. Status cascade
        let cascade = match &linked {
            Some(linked) => StatusCascader::new(&config.status_field, &config.terminal_status)
                .cascade(&*self.store, &config.linked_type, &linked.id)
                .await
                .map_err(|err| partial(&derived_id, CascadeStage::Status, err))?,
            None => CascadeOutcome::Skipped,
        };
        event!(Level::DEBUG, cascade = ?cascade, "linked status cascaded");

        Ok(Derivation {
            derived_id,
            created: true,
            cascade,
        })
    }

    async fn resolve_linked(&self, source: &Record) -> Result<Option<Record>> {
        let config = &*self.config;
        let Some(linked_id) = source.reference(&config.link_field) else {
            if config.linked_required {
                return Err(DeriveError::Validation(format!(
                    "{} '{}' has no {} set in '{}'",
                    config.source_type, source.id, config.linked_type, config.link_field
                )));
            }
            return Ok(None);
        };

        let linked = self
            .store
            .get(&config.linked_type, &linked_id)
            .await
            .map_err(DeriveError::Persistence)?;
        match linked {
            Some(linked) => Ok(Some(linked)),
            None => Err(DeriveError::Validation(format!(
                "{} '{}' references {} '{}' which does not exist",
                config.source_type, source.id, config.linked_type, linked_id
            ))),
        }
    }

    async fn persist(&self, draft: Record) -> std::result::Result<RecordId, StoreError> {
        match self.config.persist_timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.insert(draft))
                .await
                .map_err(|_| {
                    StoreError::Timeout(format!("insert did not complete within {:?}", limit))
                })?,
            None => self.store.insert(draft).await,
        }
    }
}

fn partial(derived_id: &RecordId, stage: CascadeStage, source: StoreError) -> DeriveError {
    event!(
        Level::ERROR,
        derived_id = %derived_id,
        stage = %stage,
        error = %source,
        "derived record persisted but cascade write failed"
    );
    DeriveError::PartialCascade {
        derived_id: derived_id.clone(),
        stage,
        source,
    }
}
