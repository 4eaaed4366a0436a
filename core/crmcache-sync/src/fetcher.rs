//! Remote page fetcher abstraction.
//!
//! The engine never talks HTTP directly; it asks a [`RemoteFetcher`] for
//! pages, child collections and single records. `Ok(None)` means the remote
//! answered "not found", which callers treat as "no data" rather than as a
//! failure.

use crate::error::SyncResult;
use async_trait::async_trait;
use crmcache_types::RecordId;

/// Paging window of a collection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: usize,
    pub top: usize,
}

/// One page of a remote collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Size of the whole (filtered) collection, from the total-count header.
    pub total_count: usize,
    pub records: Vec<serde_json::Value>,
}

/// Source of remote records.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetches one page of a collection. With `since` set, only records
    /// modified after that cutoff are listed.
    async fn fetch_page(
        &self,
        api_path: &str,
        window: PageWindow,
        since: Option<&str>,
    ) -> SyncResult<Option<Page>>;

    /// Fetches the dependent `child_path` collection of one parent record.
    async fn fetch_children(
        &self,
        parent_path: &str,
        parent_uid: RecordId,
        child_path: &str,
    ) -> SyncResult<Option<Vec<serde_json::Value>>>;

    /// Fetches one record by id.
    async fn fetch_by_id(
        &self,
        api_path: &str,
        uid: RecordId,
    ) -> SyncResult<Option<serde_json::Value>>;
}
