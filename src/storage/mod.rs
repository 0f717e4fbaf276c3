pub mod engine;
pub mod locks;
pub mod memory;
pub mod persistence;

pub use engine::RecordStore;
pub use locks::SourceLocks;
pub use memory::InMemoryRecordStore;
pub use persistence::{DurableRecordStore, SnapshotFile, StoreSnapshot};
