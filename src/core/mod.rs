pub mod error;
pub mod types;
pub mod value;

pub use error::{CascadeStage, DeriveError, Result, StoreError, StoreResult};
pub use types::{ChildRow, Fields, Record, RecordId};
pub use value::{DedupKey, Value};
