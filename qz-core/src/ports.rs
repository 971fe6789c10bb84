mod error;
mod store;

pub use error::{BoxError, StoreError, StoreErrorKind, StoreOp};
pub use store::{EntryMetadata, KeyPage, KeyValueStore, StoredEntry};
