//! Connection settings for the remote store.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the remote store lives and how long to wait for it.
///
/// The access token is deliberately not part of the configuration; it is
/// supplied when the store is opened.
///
/// # Examples
///
/// ```
/// use qz_remote::config::RemoteConfig;
/// use std::time::Duration;
///
/// let config = RemoteConfig {
///     namespace: "QUIZ_RESPONSES_TEST".to_owned(),
///     timeout: Duration::from_secs(5),
///     ..RemoteConfig::default()
/// };
/// assert!(config.endpoint.ends_with("/v1"));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Base URL of the service, without a trailing slash
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// The namespace holding submissions and score records
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_endpoint() -> String {
    "https://remote-storage.dan-5d7.workers.dev/v1".to_owned()
}

fn default_namespace() -> String {
    "QUIZ_RESPONSES".to_owned()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            namespace: default_namespace(),
            timeout: default_timeout(),
        }
    }
}
