//! Typed access to the key-value store.
//!
//! [`RecordStore`] turns the untyped JSON entries of a [`KeyValueStore`] into
//! submission and score records, and tags every failure with the operation
//! and key that caused it.

use crate::config::GraderConfig;
use futures_util::{StreamExt as _, TryStreamExt as _, stream};
use qz_core::{
    models::{DateTime, ScoreRecord, StudentId, SubmissionPayload, SubmissionRecord},
    ports::{KeyValueStore, StoreError, StoreErrorKind, StoreOp},
};
use serde_json::Value;
use tracing::{Level, event};

/// A stored value with the key it was read from and its creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    /// The store key
    pub key: String,
    /// The stored JSON value
    pub value: Value,
    /// When the store first received the value
    pub creation_time: DateTime,
}

/// A typed wrapper over a [`KeyValueStore`].
pub struct RecordStore<S> {
    store: S,
    submission_prefix: String,
    result_prefix: String,
    concurrency: usize,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Wrap `store`, using the key scheme in `config`.
    pub fn new(store: S, config: &GraderConfig) -> Self {
        Self {
            store,
            submission_prefix: config.submission_prefix.clone(),
            result_prefix: config.result_prefix.clone(),
            concurrency: config.fetch_concurrency.max(1),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// List every key starting with `prefix`, following cursors until the
    /// listing is exhausted.
    pub async fn list_all(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .store
                .list_keys(Some(prefix), cursor.as_deref())
                .await
                .map_err(|err| StoreError::backend(StoreOp::List, prefix, err))?;

            keys.extend(page.keys.into_iter().filter(|key| key.starts_with(prefix)));

            match page.cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    event!(
                        Level::WARN,
                        prefix,
                        cursor = %next,
                        "store returned the same cursor twice, ending listing"
                    );
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }

    /// Fetch every entry under `prefix` together with its creation time.
    ///
    /// Entries are fetched concurrently but returned in listing order. Keys
    /// that disappear between listing and fetching are skipped, as are
    /// entries the store kept no creation time for.
    pub async fn fetch_all(&self, prefix: &str) -> Result<Vec<RawEntry>, StoreError> {
        let keys = self.list_all(prefix).await?;
        event!(Level::DEBUG, prefix, count = keys.len(), "fetching entries");

        let entries: Vec<Option<RawEntry>> = stream::iter(keys)
            .map(|key| self.fetch_entry(key))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(entries.into_iter().flatten().collect())
    }

    async fn fetch_entry(&self, key: String) -> Result<Option<RawEntry>, StoreError> {
        let entry = self
            .store
            .get_item_with_metadata(&key)
            .await
            .map_err(|err| StoreError::backend(StoreOp::GetWithMetadata, key.as_str(), err))?;

        let Some(entry) = entry else {
            event!(Level::DEBUG, key, "entry vanished after listing");
            return Ok(None);
        };

        let Some(creation_time) = entry.metadata.creation_time else {
            event!(Level::WARN, key, "skipping entry without creationTime metadata");
            return Ok(None);
        };

        Ok(Some(RawEntry {
            key,
            value: entry.value,
            creation_time,
        }))
    }

    /// Fetch and decode every submission.
    ///
    /// A value that is not a submission is logged and skipped, so one bad
    /// entry does not hide the rest of the class.
    pub async fn fetch_submissions(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
        let entries = self.fetch_all(&self.submission_prefix).await?;

        let records = entries
            .into_iter()
            .filter_map(|RawEntry { key, value, creation_time }| {
                match serde_json::from_value::<SubmissionPayload>(value) {
                    Ok(payload) => Some(SubmissionRecord::new(key, creation_time, payload)),
                    Err(err) => {
                        event!(Level::WARN, key, err = err.to_string(), "skipping malformed submission");
                        None
                    }
                }
            })
            .collect();

        Ok(records)
    }

    /// Fetch every score record, keyed by the student it belongs to.
    ///
    /// Malformed records are logged and skipped.
    pub async fn fetch_scores(&self) -> Result<Vec<(StudentId, ScoreRecord)>, StoreError> {
        let keys = self.list_all(&self.result_prefix).await?;

        let records: Vec<Option<(StudentId, ScoreRecord)>> = stream::iter(keys)
            .map(|key| async move {
                let Some(student_id) = key
                    .strip_prefix(self.result_prefix.as_str())
                    .filter(|id| !id.is_empty())
                    .map(StudentId::from)
                else {
                    return Ok::<_, StoreError>(None);
                };
                let record = self.read_score(&key).await?;
                Ok(record.map(|record| (student_id, record)))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(records.into_iter().flatten().collect())
    }

    /// Load the score record stored at `key`, if there is one.
    pub async fn load_score(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError> {
        let value = self
            .store
            .get_item(key)
            .await
            .map_err(|err| StoreError::backend(StoreOp::Get, key, err))?;

        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| StoreError::decode(StoreOp::Get, key, err)),
        }
    }

    /// Load the score record stored at `key`, treating a malformed one as absent.
    ///
    /// The next save overwrites a malformed record, so it never blocks grading.
    pub async fn read_score(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError> {
        match self.load_score(key).await {
            Err(StoreError {
                kind: StoreErrorKind::Decode(err),
                ..
            }) => {
                event!(Level::WARN, key, err = err.to_string(), "ignoring malformed score record");
                Ok(None)
            }
            result => result,
        }
    }

    /// Write a score record to `key`, replacing whatever was there.
    pub async fn save_score(&self, key: &str, record: &ScoreRecord) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(record).map_err(|err| StoreError::decode(StoreOp::Set, key, err))?;

        self.store
            .set_item(key, &value)
            .await
            .map_err(|err| StoreError::backend(StoreOp::Set, key, err))
    }

    /// Delete the value at `key`.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store
            .remove_item(key)
            .await
            .map_err(|err| StoreError::backend(StoreOp::Remove, key, err))
    }

    /// Delete every value under `prefix`, returning how many were removed.
    pub async fn clear(&self, prefix: &str) -> Result<usize, StoreError> {
        let keys = self.list_all(prefix).await?;
        let count = keys.len();

        stream::iter(keys)
            .map(|key| async move { self.remove(&key).await })
            .buffer_unordered(self.concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        event!(Level::INFO, prefix, count, "cleared entries");
        Ok(count)
    }

    /// Delete every score record.
    pub async fn clear_scores(&self) -> Result<usize, StoreError> {
        self.clear(&self.result_prefix).await
    }
}
