//! SQLite implementation of [`CacheStore`].

use crate::{CacheStore, FlagCounts, RecordFilter, RecordFlags, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use crmcache_types::{CachedRecord, RecordId, SyncMarker};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        type_name TEXT NOT NULL,
        uid INTEGER NOT NULL,
        payload TEXT NOT NULL,
        last_updated INTEGER NOT NULL,
        last_retrieved INTEGER NOT NULL,
        dirty INTEGER NOT NULL DEFAULT 0,
        rescan INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (type_name, uid)
    );

    CREATE INDEX IF NOT EXISTS idx_records_flags
        ON records (type_name, rescan, dirty);

    CREATE TABLE IF NOT EXISTS sync_markers (
        type_name TEXT PRIMARY KEY,
        last_retrieved INTEGER NOT NULL
    );
";

const RECORD_COLUMNS: &str =
    "type_name, uid, payload, last_updated, last_retrieved, dirty, rescan";

/// Record cache backed by a single SQLite file.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Opens (or creates) a cache at the given path, creating the parent
    /// directory if needed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!("Opening record cache at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens an in-memory cache (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::InvalidData("cache connection lock poisoned".to_string()))
    }
}

fn to_datetime(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp out of range: {millis}")))
}

/// Binds `type_name` as `?1` followed by the filter's own parameter.
fn bind(type_name: &str, filter: RecordFilter) -> (&'static str, Vec<Value>) {
    let (condition, param) = filter.to_sql();
    let mut values = vec![Value::Text(type_name.to_string())];
    values.extend(param);
    (condition, values)
}

type RawRecord = (String, i64, String, i64, i64, bool, bool);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode(raw: RawRecord) -> StorageResult<CachedRecord> {
    let (type_name, uid, payload, last_updated, last_retrieved, dirty, rescan) = raw;
    Ok(CachedRecord {
        type_name,
        uid: RecordId::new(uid),
        payload: serde_json::from_str(&payload)?,
        last_updated: to_datetime(last_updated)?,
        last_retrieved: to_datetime(last_retrieved)?,
        dirty,
        rescan,
    })
}

impl CacheStore for SqliteCacheStore {
    fn create_schema(&self) -> StorageResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn reset(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "DROP TABLE IF EXISTS records;
             DROP TABLE IF EXISTS sync_markers;",
        )?;
        conn.execute_batch(SCHEMA)?;
        debug!("Record cache reset");
        Ok(())
    }

    fn get(&self, type_name: &str, uid: RecordId) -> StorageResult<Option<CachedRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE type_name = ?1 AND uid = ?2"),
                params![type_name, uid.get()],
                read_raw,
            )
            .optional()?;
        raw.map(decode).transpose()
    }

    fn upsert(&self, record: &CachedRecord) -> StorageResult<()> {
        let payload = serde_json::to_string(&record.payload)?;
        self.conn()?.execute(
            "INSERT INTO records
                (type_name, uid, payload, last_updated, last_retrieved, dirty, rescan)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (type_name, uid) DO UPDATE SET
                payload = excluded.payload,
                last_updated = excluded.last_updated,
                last_retrieved = excluded.last_retrieved,
                dirty = excluded.dirty,
                rescan = excluded.rescan",
            params![
                record.type_name,
                record.uid.get(),
                payload,
                record.last_updated.timestamp_millis(),
                record.last_retrieved.timestamp_millis(),
                record.dirty,
                record.rescan,
            ],
        )?;
        Ok(())
    }

    fn query(&self, type_name: &str, filter: RecordFilter) -> StorageResult<Vec<CachedRecord>> {
        let conn = self.conn()?;
        let (condition, values) = bind(type_name, filter);
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE type_name = ?1 AND {condition} ORDER BY uid"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), read_raw)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode(row?)?);
        }
        Ok(records)
    }

    fn set_flags(
        &self,
        type_name: &str,
        filter: RecordFilter,
        flags: RecordFlags,
    ) -> StorageResult<usize> {
        let (condition, values) = bind(type_name, filter);
        let touched = self.conn()?.execute(
            &format!(
                "UPDATE records SET dirty = {}, rescan = {} WHERE type_name = ?1 AND {condition}",
                i32::from(flags.dirty),
                i32::from(flags.rescan),
            ),
            params_from_iter(values),
        )?;
        Ok(touched)
    }

    fn delete(&self, type_name: &str, filter: RecordFilter) -> StorageResult<usize> {
        let (condition, values) = bind(type_name, filter);
        let removed = self.conn()?.execute(
            &format!("DELETE FROM records WHERE type_name = ?1 AND {condition}"),
            params_from_iter(values),
        )?;
        Ok(removed)
    }

    fn flag_counts(&self, type_name: &str) -> StorageResult<FlagCounts> {
        let (total, rescan, dirty): (i64, i64, i64) = self.conn()?.query_row(
            "SELECT COUNT(*), COALESCE(SUM(rescan), 0), COALESCE(SUM(dirty), 0)
             FROM records WHERE type_name = ?1",
            params![type_name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(FlagCounts {
            total: total as usize,
            rescan: rescan as usize,
            dirty: dirty as usize,
        })
    }

    fn marker(&self, type_name: &str) -> StorageResult<Option<SyncMarker>> {
        let millis: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT last_retrieved FROM sync_markers WHERE type_name = ?1",
                params![type_name],
                |row| row.get(0),
            )
            .optional()?;
        millis
            .map(|ms| to_datetime(ms).map(|at| SyncMarker::new(type_name, at)))
            .transpose()
    }

    fn save_marker(&self, marker: &SyncMarker) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT INTO sync_markers (type_name, last_retrieved) VALUES (?1, ?2)
             ON CONFLICT (type_name) DO UPDATE SET last_retrieved = excluded.last_retrieved",
            params![marker.type_name, marker.last_retrieved.timestamp_millis()],
        )?;
        Ok(())
    }
}
