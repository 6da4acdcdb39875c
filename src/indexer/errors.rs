use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::paths::PathError;
use crate::watcher::WatchError;

/// Pass-level and host-level failures.
///
/// Per-file tag failures never reach this type; they are logged and recorded
/// in the cache instead.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Reading or writing an output file failed.
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Snapshot entries could not be serialized.
    #[error("Could not serialize index: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The background poll thread could not be started.
    #[error("Could not start indexer thread: {0}")]
    Spawn(std::io::Error),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}
