use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use crate::tags::TagData;

/// Read-only cache queries.
pub mod read;
/// Schema setup and integrity checks.
pub mod schema;
/// Error mapping and store file helpers.
pub mod util;
/// Mutations and the lazily opened write transaction.
pub mod write;


/// Filename of the metadata cache inside the data directory.
pub const CACHE_FILE_NAME: &str = "cache.db";

/// Per-file extraction result kept between passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Absolute, slash-normalized path; the unique key.
    pub file: String,
    /// Modification time in epoch nanoseconds at the last extraction attempt.
    pub mtime_ns: Option<i64>,
    /// Later of modification and creation time in epoch milliseconds, for the snapshot.
    pub modified_ms: Option<i64>,
    /// Epoch milliseconds of the last extraction attempt.
    pub checked_at_ms: i64,
    /// Extracted since the last snapshot was written.
    pub dirty: bool,
    /// `None` when the last extraction failed.
    pub tag_data: Option<TagData>,
    pub is_valid: bool,
}

impl CacheRecord {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            mtime_ns: None,
            modified_ms: None,
            checked_at_ms: 0,
            dirty: false,
            tag_data: None,
            is_valid: false,
        }
    }
}

/// Errors returned by the metadata cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQLite query failed.
    #[error("Cache query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Failed to create the directory holding the cache.
    #[error("Could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A corrupt cache file could not be removed.
    #[error("Could not remove corrupt cache {path}: {source}")]
    Reset {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The store failed an integrity check or belongs to another schema.
    #[error("Cache is corrupt: {0}")]
    Corrupt(String),
    /// Tag data could not be encoded for storage.
    #[error("Could not encode tag data: {0}")]
    Encode(#[from] serde_json::Error),
    /// Database is locked or busy.
    #[error("Cache is busy, please retry")]
    Busy,
}

impl CacheError {
    /// True when the store should be discarded and rebuilt.
    pub fn is_corruption(&self) -> bool {
        match self {
            CacheError::Corrupt(_) => true,
            CacheError::Sql(err) => util::is_corruption_error(err),
            _ => false,
        }
    }
}

/// Durable per-file metadata store backed by SQLite.
///
/// Mutations accumulate in one transaction that [`persist`](Self::persist)
/// commits, so a pass costs a single fsync instead of one per file.
pub struct MetadataCache {
    connection: Connection,
    path: Option<PathBuf>,
    was_reset: bool,
}

impl MetadataCache {
    /// Open (or create) the cache at `path`.
    ///
    /// A store that is not a database, fails `quick_check` or carries a
    /// foreign schema version is deleted and recreated empty; check
    /// [`was_reset`](Self::was_reset) afterwards. Other failures propagate.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        util::create_parent_if_needed(path)?;
        match Self::open_file(path) {
            Ok(cache) => Ok(cache),
            Err(err) if err.is_corruption() => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Metadata cache is corrupt, rebuilding from scratch"
                );
                util::remove_store_files(path)?;
                let mut cache = Self::open_file(path)?;
                cache.was_reset = true;
                info!(path = %path.display(), "Created empty metadata cache");
                Ok(cache)
            }
            Err(err) => Err(err),
        }
    }

    /// Open a throwaway cache that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let connection = Connection::open_in_memory()?;
        schema::apply_schema(&connection)?;
        Ok(Self {
            connection,
            path: None,
            was_reset: false,
        })
    }

    fn open_file(path: &Path) -> Result<Self, CacheError> {
        let connection = Connection::open(path).map_err(util::map_sql_error)?;
        schema::apply_pragmas(&connection)?;
        schema::check_integrity(&connection)?;
        schema::apply_schema(&connection)?;
        Ok(Self {
            connection,
            path: Some(path.to_path_buf()),
            was_reset: false,
        })
    }

    /// Backing file, `None` for in-memory caches.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when `open` discarded a corrupt store.
    pub fn was_reset(&self) -> bool {
        self.was_reset
    }
}

impl Drop for MetadataCache {
    fn drop(&mut self) {
        if let Err(err) = self.persist() {
            warn!(error = %err, "Failed to persist metadata cache on close");
        }
    }
}
