//! Core type definitions for crmcache.
//!
//! This crate defines the plain data the rest of the workspace passes around:
//! - Entity type descriptors (what a remote collection looks like)
//! - Cached records and per-type sync markers (what the local cache holds)
//! - Remote record identifiers and timestamps
//!
//! Nothing in here performs I/O. Remote fetching lives in `crmcache-sync`,
//! persistence in `crmcache-storage`.

mod descriptor;
mod ids;
mod record;
mod timestamp;

pub use descriptor::{EntityDescriptor, SyncStrategy};
pub use ids::RecordId;
pub use record::{CachedRecord, QUICKSCAN_OVERLAP_DAYS, SyncMarker};
pub use timestamp::{
    CUTOFF_FORMAT, REMOTE_TIMESTAMP_FORMAT, TIMESTAMP_PRECISION_DIGITS, format_cutoff,
    parse_remote_timestamp,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interpreting remote payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record is missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` has an unusable value: {value}")]
    InvalidField { field: String, value: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
