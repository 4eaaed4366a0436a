//! Local record cache for crmcache.
//!
//! Every cached record lives in one `records` table keyed by
//! `(type_name, uid)`; the payload is kept as an opaque JSON string next to
//! the few fields the sync engine reasons about (timestamps and the
//! `dirty`/`rescan` flags). A second table holds one sync marker per type.
//!
//! The sync engine only talks to the [`CacheStore`] trait. Each method is a
//! single statement, so every call is atomic on its own; nothing here spans
//! a transaction across calls.

mod error;
mod filter;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use filter::{FlagCounts, RecordFilter, RecordFlags};
pub use sqlite::SqliteCacheStore;

use crmcache_types::{CachedRecord, RecordId, SyncMarker};

/// Storage contract the sync engine relies on.
pub trait CacheStore: Send + Sync {
    /// Creates missing tables. Safe to call repeatedly.
    fn create_schema(&self) -> StorageResult<()>;

    /// Drops every table and recreates an empty cache.
    fn reset(&self) -> StorageResult<()>;

    /// Looks up one record.
    fn get(&self, type_name: &str, uid: RecordId) -> StorageResult<Option<CachedRecord>>;

    /// Inserts the record, or replaces the row with the same type and id.
    fn upsert(&self, record: &CachedRecord) -> StorageResult<()>;

    /// Returns the records of a type matching `filter`, ordered by id.
    fn query(&self, type_name: &str, filter: RecordFilter) -> StorageResult<Vec<CachedRecord>>;

    /// Sets both flags on every record of a type matching `filter`.
    /// Returns the number of rows touched.
    fn set_flags(
        &self,
        type_name: &str,
        filter: RecordFilter,
        flags: RecordFlags,
    ) -> StorageResult<usize>;

    /// Deletes the records of a type matching `filter`. Returns the number
    /// of rows removed.
    fn delete(&self, type_name: &str, filter: RecordFilter) -> StorageResult<usize>;

    /// Counts records of a type by flag.
    fn flag_counts(&self, type_name: &str) -> StorageResult<FlagCounts>;

    /// Returns the sync marker of a type, if it completed a pass before.
    fn marker(&self, type_name: &str) -> StorageResult<Option<SyncMarker>>;

    /// Creates or moves the sync marker of a type.
    fn save_marker(&self, marker: &SyncMarker) -> StorageResult<()>;
}
