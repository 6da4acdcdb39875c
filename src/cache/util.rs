use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;

use super::CacheError;
use crate::fs_ops::remove_if_exists;

/// Translate rusqlite errors into friendlier CacheError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> CacheError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            CacheError::Busy
        }
        other => CacheError::Sql(other),
    }
}

/// SQLite reports the file is not a database or its pages are damaged.
pub(super) fn is_corruption_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(sql_err, _)
            if matches!(sql_err.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), CacheError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Delete the store and its WAL side files.
pub(super) fn remove_store_files(path: &Path) -> Result<(), CacheError> {
    for candidate in [
        path.to_path_buf(),
        side_file(path, "-wal"),
        side_file(path, "-shm"),
    ] {
        remove_if_exists(&candidate).map_err(|source| CacheError::Reset {
            path: candidate.clone(),
            source,
        })?;
    }
    Ok(())
}

fn side_file(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
