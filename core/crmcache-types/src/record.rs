use crate::RecordId;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Overlap subtracted from a sync marker when computing a quickscan cutoff,
/// so records modified around the previous run are fetched again.
pub const QUICKSCAN_OVERLAP_DAYS: i64 = 1;

/// One cached remote record.
///
/// The payload is opaque: only the id and (for main types) the modification
/// time are extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub type_name: String,
    pub uid: RecordId,
    pub payload: serde_json::Value,
    /// Remote modification time, or retrieval time for primitive types.
    pub last_updated: DateTime<Utc>,
    pub last_retrieved: DateTime<Utc>,
    /// Not confirmed upstream since its last rescan attempt.
    pub dirty: bool,
    /// Forced refresh requested.
    pub rescan: bool,
}

impl CachedRecord {
    /// Creates a record as first seen, with both flags cleared.
    pub fn new(
        type_name: impl Into<String>,
        uid: RecordId,
        payload: serde_json::Value,
        last_updated: DateTime<Utc>,
        last_retrieved: DateTime<Utc>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            uid,
            payload,
            last_updated,
            last_retrieved,
            dirty: false,
            rescan: false,
        }
    }

    /// Overwrites the payload and timestamps with freshly fetched data.
    /// A refresh confirms the record, so both flags are cleared.
    pub fn refresh(
        &mut self,
        payload: serde_json::Value,
        last_updated: DateTime<Utc>,
        last_retrieved: DateTime<Utc>,
    ) {
        self.payload = payload;
        self.last_updated = last_updated;
        self.last_retrieved = last_retrieved;
        self.dirty = false;
        self.rescan = false;
    }

    /// Dirty and no longer waiting for a rescan: eligible for pruning.
    pub fn is_unconfirmed(&self) -> bool {
        self.dirty && !self.rescan
    }

    /// Reads a top-level payload field.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

/// When a type last completed a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMarker {
    pub type_name: String,
    pub last_retrieved: DateTime<Utc>,
}

impl SyncMarker {
    pub fn new(type_name: impl Into<String>, last_retrieved: DateTime<Utc>) -> Self {
        Self {
            type_name: type_name.into(),
            last_retrieved,
        }
    }

    /// Lower bound for the next incremental fetch.
    pub fn quickscan_cutoff(&self) -> DateTime<Utc> {
        self.last_retrieved - TimeDelta::days(QUICKSCAN_OVERLAP_DAYS)
    }
}
