use thiserror::Error;

/// Failures talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be built, sent, or read
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a status outside the 2xx range
    #[error("remote storage answered {status}: {body}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// The response body, as text
        body: String,
    },

    /// The response body is not the JSON the protocol promises
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}
