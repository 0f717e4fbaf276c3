//! Named derivation procedures.
//!
//! Hosts look procedures up by name on every call, so replacing the handler
//! registered under a name takes effect for the next request without touching
//! callers.

use crate::core::{DeriveError, RecordId, Result};
use crate::derive::DerivationEngine;
use crate::storage::RecordStore;
use async_trait::async_trait;
use futures::future::BoxFuture;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Call signature shared by the standard procedure and its replacements.
#[async_trait]
pub trait DerivationHandler: Send + Sync {
    async fn derive(&self, source_id: &RecordId) -> Result<RecordId>;
}

#[async_trait]
impl<S: RecordStore + 'static> DerivationHandler for DerivationEngine<S> {
    async fn derive(&self, source_id: &RecordId) -> Result<RecordId> {
        self.derive_record(source_id).await
    }
}

type HandlerFn = dyn Fn(RecordId) -> BoxFuture<'static, Result<RecordId>> + Send + Sync;

/// Adapts a plain async function to [`DerivationHandler`].
pub struct FnHandler {
    inner: Box<HandlerFn>,
}

impl FnHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RecordId) -> BoxFuture<'static, Result<RecordId>> + Send + Sync + 'static,
    {
        Self { inner: Box::new(f) }
    }
}

#[async_trait]
impl DerivationHandler for FnHandler {
    async fn derive(&self, source_id: &RecordId) -> Result<RecordId> {
        (self.inner)(source_id.clone()).await
    }
}

/// Explicit name → handler table, owned by whoever dispatches derivations.
#[derive(Default)]
pub struct DerivationRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn DerivationHandler>>>,
}

impl DerivationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; fails if the name is taken.
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn DerivationHandler>,
    ) -> Result<()> {
        let name = name.into();
        let mut handlers = self.write()?;
        if handlers.contains_key(&name) {
            return Err(DeriveError::Config(format!(
                "derivation handler '{}' is already registered",
                name
            )));
        }
        info!("registered derivation handler '{}'", name);
        handlers.insert(name, handler);
        Ok(())
    }

    /// Replace (or install) the handler under `name`, returning the previous one.
    pub fn override_with(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn DerivationHandler>,
    ) -> Result<Option<Arc<dyn DerivationHandler>>> {
        let name = name.into();
        let previous = self.write()?.insert(name.clone(), handler);
        info!("overrode derivation handler '{}'", name);
        Ok(previous)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DerivationHandler>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|e| DeriveError::Config(format!("registry lock poisoned: {}", e)))?;
        handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DeriveError::UnknownHandler(name.to_string()))
    }

    /// Resolve `name` now and run it.
    pub async fn invoke(&self, name: &str, source_id: &RecordId) -> Result<RecordId> {
        let handler = self.resolve(name)?;
        handler.derive(source_id).await
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn DerivationHandler>>>> {
        self.handlers
            .write()
            .map_err(|e| DeriveError::Config(format!("registry lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn fixed(id: &'static str) -> Arc<dyn DerivationHandler> {
        Arc::new(FnHandler::new(move |_source| async move { Ok(RecordId::from(id)) }.boxed()))
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = DerivationRegistry::new();
        registry.register("make_project", fixed("P-standard")).unwrap();

        let id = registry
            .invoke("make_project", &RecordId::from("Q1"))
            .await
            .unwrap();
        assert_eq!(id, RecordId::from("P-standard"));

        let duplicate = registry.register("make_project", fixed("P-other"));
        assert!(matches!(duplicate, Err(DeriveError::Config(_))));
    }

    #[tokio::test]
    async fn test_override_is_resolved_at_call_time() {
        let registry = DerivationRegistry::new();
        registry.register("make_project", fixed("P-standard")).unwrap();

        let previous = registry
            .override_with("make_project", fixed("P-custom"))
            .unwrap();
        assert!(previous.is_some());

        let id = registry
            .invoke("make_project", &RecordId::from("Q1"))
            .await
            .unwrap();
        assert_eq!(id, RecordId::from("P-custom"));
        assert_eq!(registry.names(), vec!["make_project".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_handler() {
        let registry = DerivationRegistry::new();
        let err = registry
            .invoke("missing", &RecordId::from("Q1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeriveError::UnknownHandler(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_plain_function_receives_source_id() {
        let registry = DerivationRegistry::new();
        registry
            .register(
                "echo",
                Arc::new(FnHandler::new(|source: RecordId| {
                    async move { Ok(RecordId::new(format!("derived-{}", source))) }.boxed()
                })),
            )
            .unwrap();

        let id = registry.invoke("echo", &RecordId::from("Q7")).await.unwrap();
        assert_eq!(id.as_str(), "derived-Q7");
    }
}
