use std::fmt::Display;
use thiserror::Error;

/// A type-erased backend error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Listing keys
    List,
    /// Reading a value
    Get,
    /// Reading a value and its metadata
    GetWithMetadata,
    /// Writing a value
    Set,
    /// Deleting a value
    Remove,
}

impl Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StoreOp::List => "list",
            StoreOp::Get => "get",
            StoreOp::GetWithMetadata => "get-with-metadata",
            StoreOp::Set => "set",
            StoreOp::Remove => "remove",
        })
    }
}

/// A storage failure, tagged with the operation and key involved.
///
/// For listings, `key` holds the prefix that was being listed.
#[derive(Debug, Error)]
#[error("store {op} failed for `{key}`")]
pub struct StoreError {
    /// The failed operation
    pub op: StoreOp,
    /// The key (or listing prefix) involved
    pub key: String,
    /// What went wrong
    #[source]
    pub kind: StoreErrorKind,
}

/// The reasons a store operation can fail.
#[derive(Debug, Error)]
pub enum StoreErrorKind {
    /// The backend reported an error
    #[error("backend failure")]
    Backend(#[source] BoxError),

    /// The stored value does not have the expected shape
    #[error("malformed value")]
    Decode(#[source] serde_json::Error),
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend(
        op: StoreOp,
        key: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            op,
            key: key.into(),
            kind: StoreErrorKind::Backend(Box::new(err)),
        }
    }

    /// Report a value that failed to decode.
    pub fn decode(op: StoreOp, key: impl Into<String>, err: serde_json::Error) -> Self {
        Self {
            op,
            key: key.into(),
            kind: StoreErrorKind::Decode(err),
        }
    }
}
