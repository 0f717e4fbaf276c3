use crate::core::{RecordId, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type SlotKey = (String, RecordId);

/// One async mutex per record, owned by the store.
///
/// Every engine over the same store shares these slots, so derivations of the
/// same source run one after another no matter which engine issued them.
/// Different records never contend. Entries nobody holds or waits on are
/// pruned on the next acquire.
#[derive(Default)]
pub struct SourceLocks {
    slots: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> StoreResult<OwnedMutexGuard<()>> {
        let key = (doc_type.to_string(), id.clone());
        let slot = {
            let mut slots = self.slots.lock()?;
            slots.retain(|held, slot| *held == key || Arc::strong_count(slot) > 1);
            slots.entry(key).or_default().clone()
        };
        Ok(slot.lock_owned().await)
    }

    /// Number of tracked slots (held, awaited, or not yet pruned).
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}
