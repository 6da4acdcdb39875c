use rusqlite::{Connection, OptionalExtension, params};

use super::CacheError;
use super::util::map_sql_error;

/// Layout version stored in the `metadata` table; any other value means the
/// file belongs to a different layout and gets rebuilt.
pub const SCHEMA_VERSION: &str = "1";
const META_SCHEMA_VERSION: &str = "schema_version";

pub(super) fn apply_pragmas(connection: &Connection) -> Result<(), CacheError> {
    connection
        .execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
        )
        .map_err(map_sql_error)
}

/// Run SQLite's cheap structural check.
pub(super) fn check_integrity(connection: &Connection) -> Result<(), CacheError> {
    let result: String = connection
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(map_sql_error)?;
    if result.eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(CacheError::Corrupt(result))
    }
}

pub(super) fn apply_schema(connection: &Connection) -> Result<(), CacheError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS file_cache (
                file TEXT PRIMARY KEY,
                mtime_ns INTEGER,
                modified_ms INTEGER,
                checked_at_ms INTEGER NOT NULL,
                dirty INTEGER NOT NULL DEFAULT 0,
                tag_data TEXT,
                is_valid INTEGER NOT NULL DEFAULT 0
             );
             CREATE INDEX IF NOT EXISTS idx_file_cache_dirty ON file_cache (dirty);",
        )
        .map_err(map_sql_error)?;
    ensure_schema_version(connection)
}

fn ensure_schema_version(connection: &Connection) -> Result<(), CacheError> {
    let stored: Option<String> = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![META_SCHEMA_VERSION],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sql_error)?;
    match stored {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(version) => Err(CacheError::Corrupt(format!(
            "unexpected schema version {version}"
        ))),
        None => {
            connection
                .execute(
                    "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
                    params![META_SCHEMA_VERSION, SCHEMA_VERSION],
                )
                .map_err(map_sql_error)?;
            Ok(())
        }
    }
}
