use std::collections::HashSet;

use rusqlite::{OptionalExtension, Row, params};
use tracing::warn;

use super::util::map_sql_error;
use super::{CacheError, CacheRecord, MetadataCache};

const RECORD_COLUMNS: &str =
    "file, mtime_ns, modified_ms, checked_at_ms, dirty, tag_data, is_valid";

/// Row as stored, before the tag JSON is decoded.
struct StoredRow {
    file: String,
    mtime_ns: Option<i64>,
    modified_ms: Option<i64>,
    checked_at_ms: i64,
    dirty: bool,
    tag_data: Option<String>,
    is_valid: bool,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            file: row.get(0)?,
            mtime_ns: row.get(1)?,
            modified_ms: row.get(2)?,
            checked_at_ms: row.get(3)?,
            dirty: row.get(4)?,
            tag_data: row.get(5)?,
            is_valid: row.get(6)?,
        })
    }

    /// Undecodable tag JSON drops the mtime so the file is read again.
    fn into_record(self) -> CacheRecord {
        let mut record = CacheRecord {
            file: self.file,
            mtime_ns: self.mtime_ns,
            modified_ms: self.modified_ms,
            checked_at_ms: self.checked_at_ms,
            dirty: self.dirty,
            tag_data: None,
            is_valid: self.is_valid,
        };
        if let Some(json) = self.tag_data {
            match serde_json::from_str(&json) {
                Ok(data) => record.tag_data = Some(data),
                Err(err) => {
                    warn!(file = %record.file, error = %err, "Discarding unreadable cached tag data");
                    record.mtime_ns = None;
                    record.is_valid = false;
                }
            }
        }
        record
    }
}

impl MetadataCache {
    /// Fetch the record stored for `file`, if any.
    pub fn get(&self, file: &str) -> Result<Option<CacheRecord>, CacheError> {
        let mut stmt = self
            .connection
            .prepare_cached(&format!(
                "SELECT {RECORD_COLUMNS} FROM file_cache WHERE file = ?1"
            ))
            .map_err(map_sql_error)?;
        let row = stmt
            .query_row(params![file], StoredRow::from_row)
            .optional()
            .map_err(map_sql_error)?;
        Ok(row.map(StoredRow::into_record))
    }

    /// Every record, ordered by key.
    pub fn all(&self) -> Result<Vec<CacheRecord>, CacheError> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS} FROM file_cache ORDER BY file ASC"
        ))
    }

    /// Records extracted since the last snapshot was written.
    pub fn find_dirty(&self) -> Result<Vec<CacheRecord>, CacheError> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS} FROM file_cache WHERE dirty != 0 ORDER BY file ASC"
        ))
    }

    /// Records whose key is not in `current`.
    pub fn find_orphans(&self, current: &HashSet<String>) -> Result<Vec<CacheRecord>, CacheError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|record| !current.contains(&record.file))
            .collect())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM file_cache", [], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn query_records(&self, sql: &str) -> Result<Vec<CacheRecord>, CacheError> {
        let mut stmt = self.connection.prepare_cached(sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], StoredRow::from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows.into_iter().map(StoredRow::into_record).collect())
    }
}
