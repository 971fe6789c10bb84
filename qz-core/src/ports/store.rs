use crate::models::DateTime;
use serde_json::Value;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyPage {
    /// The keys on this page
    pub keys: Vec<String>,
    /// Where to resume listing, or `None` if this was the last page
    pub cursor: Option<String>,
}

impl KeyPage {
    /// A page that completes the listing.
    pub fn last(keys: Vec<String>) -> Self {
        Self { keys, cursor: None }
    }
}

/// Metadata the store keeps alongside each value.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntryMetadata {
    /// When the value was first written
    #[serde(rename = "creationTime", default)]
    pub creation_time: Option<DateTime>,
}

/// A value together with its metadata.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredEntry {
    /// The stored JSON value
    pub value: Value,
    /// The store-maintained metadata
    #[serde(default)]
    pub metadata: EntryMetadata,
}

/// A namespaced, authenticated key-value store holding JSON values.
///
/// This is the only contract the grading engine has with storage. A backend
/// is scoped to one namespace and one credential when it is constructed, so
/// neither appears in the method signatures.
///
/// Backends report failures through their own error type; the engine wraps
/// them in [`StoreError`](super::StoreError) together with the operation and
/// key that failed.
pub trait KeyValueStore: Send + Sync {
    /// The backend-specific error type
    type Error: std::error::Error + Send + Sync + 'static;

    /// List one page of keys, optionally restricted to those starting with `prefix`.
    ///
    /// Pass the `cursor` of the previous page to continue a listing. Backends
    /// that cannot filter by prefix may return extra keys; callers filter again.
    fn list_keys(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<KeyPage, Self::Error>> + Send;

    /// Retrieve a value, or `None` if the key is absent.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send;

    /// Retrieve a value with its metadata, or `None` if the key is absent.
    fn get_item_with_metadata(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<StoredEntry>, Self::Error>> + Send;

    /// Create or overwrite a value.
    fn set_item(&self, key: &str, value: &Value) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Delete a value. Deleting an absent key is not an error.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
