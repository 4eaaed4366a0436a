use chrono::{DateTime, Utc};
use crmcache_types::RecordId;
use rusqlite::types::Value;
use serde::Serialize;

/// Predicate over the records of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record.
    All,
    /// A single record.
    Id(RecordId),
    /// Records flagged for rescan.
    RescanPending,
    /// Records that are dirty and no longer flagged for rescan.
    Unconfirmed,
    /// Records whose `last_updated` is strictly after the instant.
    UpdatedAfter(DateTime<Utc>),
}

impl RecordFilter {
    /// SQL condition plus its bound parameter, appended after `type_name = ?1`.
    pub(crate) fn to_sql(self) -> (&'static str, Option<Value>) {
        match self {
            Self::All => ("1 = 1", None),
            Self::Id(uid) => ("uid = ?2", Some(Value::Integer(uid.get()))),
            Self::RescanPending => ("rescan = 1", None),
            Self::Unconfirmed => ("dirty = 1 AND rescan = 0", None),
            Self::UpdatedAfter(at) => (
                "last_updated > ?2",
                Some(Value::Integer(at.timestamp_millis())),
            ),
        }
    }
}

/// Flag values written by [`crate::CacheStore::set_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordFlags {
    pub dirty: bool,
    pub rescan: bool,
}

impl RecordFlags {
    /// Dirty and waiting for a rescan.
    pub const MARKED: Self = Self {
        dirty: true,
        rescan: true,
    };

    /// Both flags cleared.
    pub const CLEAR: Self = Self {
        dirty: false,
        rescan: false,
    };

    /// Rescan done, record not found upstream.
    pub const MISSING: Self = Self {
        dirty: true,
        rescan: false,
    };
}

/// Per-type record counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FlagCounts {
    pub total: usize,
    pub rescan: usize,
    pub dirty: usize,
}

impl FlagCounts {
    /// Percentage of records still flagged for rescan.
    pub fn rescan_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.rescan as f64 * 100.0 / self.total as f64
        }
    }
}
