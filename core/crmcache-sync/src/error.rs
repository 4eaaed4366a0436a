//! Error types for the sync layer.

use crmcache_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// Not-found responses and rate limiting never show up here: the fetcher
/// reports the former as `Ok(None)` and retries the latter itself.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a status the sync cannot handle.
    #[error("cannot retrieve {url}: status code {status}")]
    Api { status: u16, url: String },

    /// The response body was not what the endpoint promises.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A fetched record lacks its id or modification time.
    #[error("invalid {entity_type} record: {source}")]
    InvalidRecord {
        entity_type: String,
        #[source]
        source: crmcache_types::Error,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No registered type matches the given name.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn invalid_record(
        entity_type: &str,
    ) -> impl FnOnce(crmcache_types::Error) -> Self + '_ {
        move |source| SyncError::InvalidRecord {
            entity_type: entity_type.to_string(),
            source,
        }
    }
}
