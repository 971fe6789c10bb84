#![warn(missing_docs)]
// Note: this overwrites the link in the README to point to the rust docs of the qz-core crate.
//! [qz_core]: https://docs.rs/qz_core/latest/qz_core/index.html
#![doc = include_str!("../README.md")]

pub mod config;
mod error;

pub use error::RemoteError;

use config::RemoteConfig;
use qz_core::ports::{KeyPage, KeyValueStore, StoredEntry};
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{Level, event};

/// A handle to one namespace of the remote store.
///
/// The handle is cheap to clone; clones share a connection pool.
#[derive(Clone)]
pub struct RemoteStorage {
    client: Client,
    endpoint: String,
    namespace: String,
    token: String,
}

impl std::fmt::Debug for RemoteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorage")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RemoteStorage {
    /// Open the namespace in `config`, authenticating every request with `token`.
    ///
    /// No request is made until the first operation; a bad token shows up
    /// as a [`RemoteError::Status`] then.
    pub fn open(config: &RemoteConfig, token: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            namespace: config.namespace.clone(),
            token: token.into(),
        })
    }

    /// The namespace this handle is scoped to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.endpoint))
            .header(header::AUTHORIZATION, &self.token)
            .query(&[("namespace", self.namespace.as_str())])
    }

    /// Send a request and return the body of a successful response.
    ///
    /// `Ok(None)` means the service answered 404.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Option<Vec<u8>>, RemoteError> {
        let response = request.send().await.inspect_err(|err| {
            event!(Level::WARN, path, err = err.to_string(), "remote request failed");
        })?;

        let status = response.status();
        event!(Level::DEBUG, path, status = status.as_u16(), "remote response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    /// Decode an optional JSON body, treating an empty body or `null` as absent.
    fn decode<T: DeserializeOwned>(body: Option<Vec<u8>>) -> Result<Option<T>, RemoteError> {
        match body {
            Some(bytes) if !bytes.trim_ascii().is_empty() => Ok(serde_json::from_slice(&bytes)?),
            _ => Ok(None),
        }
    }
}

/// The two shapes a listing can take.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Complete(Vec<ListedKey>),
    Page {
        keys: Vec<ListedKey>,
        #[serde(default)]
        cursor: Option<String>,
        #[serde(default)]
        list_complete: bool,
    },
}

/// A listed key, either bare or as a `{"name": ...}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListedKey {
    Name(String),
    Entry { name: String },
}

impl From<ListedKey> for String {
    fn from(value: ListedKey) -> Self {
        match value {
            ListedKey::Name(name) | ListedKey::Entry { name } => name,
        }
    }
}

impl From<ListResponse> for KeyPage {
    fn from(value: ListResponse) -> Self {
        match value {
            ListResponse::Complete(keys) => KeyPage::last(keys.into_iter().map(String::from).collect()),
            ListResponse::Page {
                keys,
                cursor,
                list_complete,
            } => KeyPage {
                keys: keys.into_iter().map(String::from).collect(),
                cursor: cursor.filter(|cursor| !list_complete && !cursor.is_empty()),
            },
        }
    }
}

impl KeyValueStore for RemoteStorage {
    type Error = RemoteError;

    async fn list_keys(&self, prefix: Option<&str>, cursor: Option<&str>) -> Result<KeyPage, Self::Error> {
        let mut request = self.request(Method::GET, "/list");
        if let Some(prefix) = prefix {
            request = request.query(&[("prefix", prefix)]);
        }
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let listing: Option<ListResponse> = Self::decode(self.send("/list", request).await?)?;
        Ok(listing.map(KeyPage::from).unwrap_or_default())
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, Self::Error> {
        let request = self.request(Method::GET, "/get").query(&[("key", key)]);
        let value: Option<Value> = Self::decode(self.send("/get", request).await?)?;
        Ok(value.filter(|value| !value.is_null()))
    }

    async fn get_item_with_metadata(&self, key: &str) -> Result<Option<StoredEntry>, Self::Error> {
        let request = self
            .request(Method::GET, "/getWithMetadata")
            .query(&[("key", key)]);
        let entry: Option<StoredEntry> = Self::decode(self.send("/getWithMetadata", request).await?)?;
        Ok(entry.filter(|entry| !entry.value.is_null()))
    }

    async fn set_item(&self, key: &str, value: &Value) -> Result<(), Self::Error> {
        let request = self
            .request(Method::POST, "/set")
            .json(&json!({ "key": key, "value": value }));

        match self.send("/set", request).await? {
            Some(_) => Ok(()),
            None => Err(RemoteError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("namespace `{}` not found", self.namespace),
            }),
        }
    }

    async fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        let request = self.request(Method::DELETE, "/delete").query(&[("key", key)]);
        self.send("/delete", request).await?;
        Ok(())
    }
}
