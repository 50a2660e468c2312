use std::io;

use thiserror::Error;

use crate::types::{ContentHash, DatasetName, TextFieldName};

/// Error type for store fetches, index builds, and pipeline configuration.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A store call stayed outstanding past the configured timeout.
    #[error("fetch of '{hash}' timed out")]
    FetchTimeout { hash: ContentHash },
    /// The store answered with a non-success HTTP status.
    #[error("fetch of '{hash}' failed with status {status}")]
    FetchFailed { hash: ContentHash, status: u16 },
    /// The request never completed (connection, TLS, or body errors).
    #[error("transport failure for '{hash}': {reason}")]
    Transport { hash: ContentHash, reason: String },
    /// A response body could not be decoded.
    #[error("malformed leaf listing fragment: {0}")]
    Parse(String),
    /// A JSON leaf record lacks the configured text attribute.
    #[error("leaf '{hash}' carries no '{field}' text attribute")]
    MissingTextField {
        hash: ContentHash,
        field: TextFieldName,
    },
    /// Neither the network walk nor the cache produced leaf refs.
    #[error("index build for dataset '{dataset}' yielded no leaf refs: {reason}")]
    IndexBuild {
        dataset: DatasetName,
        reason: String,
    },
    /// A caller-supplied parameter the pipeline cannot run with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Filesystem failure while touching the cache.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Cache entry failed to encode or decode.
    #[error("cache encoding failure: {0}")]
    CacheCodec(#[from] serde_json::Error),
}

impl StreamError {
    /// Classify a reqwest failure for the object addressed by `hash`.
    pub(crate) fn from_reqwest(hash: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return StreamError::FetchTimeout {
                hash: hash.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return StreamError::FetchFailed {
                hash: hash.to_string(),
                status: status.as_u16(),
            };
        }
        StreamError::Transport {
            hash: hash.to_string(),
            reason: err.to_string(),
        }
    }
}
