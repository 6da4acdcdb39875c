use rusqlite::params;

use super::util::map_sql_error;
use super::{CacheError, CacheRecord, MetadataCache};

impl MetadataCache {
    /// Insert the record, or replace the stored one with the same key.
    pub fn upsert(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let tag_data = record
            .tag_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.begin_if_needed()?;
        let mut stmt = self
            .connection
            .prepare_cached(
                "INSERT INTO file_cache
                    (file, mtime_ns, modified_ms, checked_at_ms, dirty, tag_data, is_valid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(file) DO UPDATE SET mtime_ns = excluded.mtime_ns,
                                                 modified_ms = excluded.modified_ms,
                                                 checked_at_ms = excluded.checked_at_ms,
                                                 dirty = excluded.dirty,
                                                 tag_data = excluded.tag_data,
                                                 is_valid = excluded.is_valid",
            )
            .map_err(map_sql_error)?;
        stmt.execute(params![
            record.file,
            record.mtime_ns,
            record.modified_ms,
            record.checked_at_ms,
            record.dirty,
            tag_data,
            record.is_valid,
        ])
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Delete the record for `file`; returns whether one existed.
    pub fn remove(&self, file: &str) -> Result<bool, CacheError> {
        self.begin_if_needed()?;
        let removed = self
            .connection
            .prepare_cached("DELETE FROM file_cache WHERE file = ?1")
            .map_err(map_sql_error)?
            .execute(params![file])
            .map_err(map_sql_error)?;
        Ok(removed > 0)
    }

    /// Reset the dirty flag on the given keys.
    pub fn clear_dirty(&self, files: &[String]) -> Result<(), CacheError> {
        if files.is_empty() {
            return Ok(());
        }
        self.begin_if_needed()?;
        let mut stmt = self
            .connection
            .prepare_cached("UPDATE file_cache SET dirty = 0 WHERE file = ?1")
            .map_err(map_sql_error)?;
        for file in files {
            stmt.execute(params![file]).map_err(map_sql_error)?;
        }
        Ok(())
    }

    /// Drop every record.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.begin_if_needed()?;
        self.connection
            .execute("DELETE FROM file_cache", [])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Commit pending mutations to disk. A no-op when nothing changed.
    pub fn persist(&self) -> Result<(), CacheError> {
        if self.connection.is_autocommit() {
            return Ok(());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(map_sql_error)
    }

    /// True while mutations are waiting for [`persist`](Self::persist).
    pub fn has_pending_writes(&self) -> bool {
        !self.connection.is_autocommit()
    }

    fn begin_if_needed(&self) -> Result<(), CacheError> {
        if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(map_sql_error)?;
        }
        Ok(())
    }
}
