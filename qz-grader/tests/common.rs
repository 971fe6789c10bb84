#![allow(dead_code)]

use qz_core::{
    models::DateTime,
    ports::{EntryMetadata, KeyPage, KeyValueStore, StoredEntry},
};
use serde_json::{Value, json};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};
use time::{Duration, macros::datetime};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    subscriber::DefaultGuard,
};
use tracing_subscriber::{
    layer::{Context, Layer, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

type IndexMap<K, V> = indexmap::IndexMap<K, V, rustc_hash::FxBuildHasher>;

/// An instant relative to a fixed point in time.
pub fn at(offset_ms: i64) -> DateTime {
    (datetime!(2025-05-24 09:00 UTC) + Duration::milliseconds(offset_ms)).into()
}

/// The JSON a quiz form submits.
pub fn submission(student_id: &str, first: &str, last: &str, response: &str) -> Value {
    json!({
        "studentID": student_id,
        "firstName": first,
        "lastName": last,
        "hashedID": format!("h{student_id}"),
        "response": response,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("injected write failure")]
    Injected,
    #[error("invalid cursor `{0}`")]
    InvalidCursor(String),
}

struct Entry {
    value: Value,
    created: Option<DateTime>,
}

#[derive(Default)]
struct Inner {
    entries: IndexMap<String, Entry>,
    page_size: Option<usize>,
    fail_writes: bool,
    stall_writes: bool,
    writes: usize,
    list_calls: usize,
}

/// An in-memory store. Clones share the same entries, so a test can keep a
/// handle after giving one to a session.
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<Mutex<Inner>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split listings into pages of `page_size` keys.
    pub fn paged(page_size: usize) -> Self {
        let store = Self::new();
        store.lock().page_size = Some(page_size.max(1));
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }

    pub fn insert(&self, key: &str, value: Value, created: DateTime) {
        self.lock().entries.insert(
            key.to_owned(),
            Entry {
                value,
                created: Some(created),
            },
        );
    }

    pub fn insert_without_metadata(&self, key: &str, value: Value) {
        self.lock()
            .entries
            .insert(key.to_owned(), Entry { value, created: None });
    }

    pub fn submit(&self, key: &str, student_id: &str, first: &str, last: &str, offset_ms: i64) {
        self.insert(
            key,
            submission(student_id, first, last, &format!("// {key}")),
            at(offset_ms),
        );
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make writes hang until the caller gives up on them.
    pub fn stall_writes(&self, stall: bool) {
        self.lock().stall_writes = stall;
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }
}

impl KeyValueStore for MemoryStore {
    type Error = MemoryError;

    async fn list_keys(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<KeyPage, Self::Error> {
        let mut inner = self.lock();
        inner.list_calls += 1;

        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .cloned()
            .collect();

        let start = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| MemoryError::InvalidCursor(cursor.to_owned()))?,
            None => 0,
        };

        let Some(page_size) = inner.page_size else {
            return Ok(KeyPage::last(keys));
        };

        let end = (start + page_size).min(keys.len());
        let page = keys.get(start..end).unwrap_or_default().to_vec();
        Ok(KeyPage {
            keys: page,
            cursor: (end < keys.len()).then(|| end.to_string()),
        })
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.value(key))
    }

    async fn get_item_with_metadata(&self, key: &str) -> Result<Option<StoredEntry>, Self::Error> {
        Ok(self.lock().entries.get(key).map(|entry| StoredEntry {
            value: entry.value.clone(),
            metadata: EntryMetadata {
                creation_time: entry.created,
            },
        }))
    }

    async fn set_item(&self, key: &str, value: &Value) -> Result<(), Self::Error> {
        let stall = self.lock().stall_writes;
        if stall {
            std::future::pending::<()>().await;
        }

        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(MemoryError::Injected);
        }
        inner.writes += 1;

        let created = inner
            .entries
            .get(key)
            .and_then(|entry| entry.created)
            .unwrap_or_else(DateTime::now);
        inner.entries.insert(
            key.to_owned(),
            Entry {
                value: value.clone(),
                created: Some(created),
            },
        );
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        self.lock().entries.shift_remove(key);
        Ok(())
    }
}

/// Collects the messages of `WARN` events emitted on the current thread.
#[derive(Clone, Default)]
pub struct Warnings(Arc<Mutex<Vec<String>>>);

impl Warnings {
    /// Start collecting. Collection stops when the guard is dropped.
    pub fn capture() -> (Self, DefaultGuard) {
        let warnings = Self::default();
        let guard = tracing_subscriber::registry()
            .with(warnings.clone())
            .set_default();
        (warnings, guard)
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|message| message.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for Warnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut message = Message::default();
            event.record(&mut message);
            self.0.lock().unwrap().push(message.0);
        }
    }
}

#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
