use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::app_dirs;

use super::{ConfigError, map_app_dir_error};

/// Default filename used to store the indexer configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Audio extensions watched when the config does not list any (lowercase, without dots).
pub const DEFAULT_WATCHED_EXTENSIONS: [&str; 4] = ["mp3", "mp4", "m4a", "ogg"];

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Settings that shape watching, extraction and index output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// File extensions treated as audio, compared case-insensitively.
    #[serde(default = "default_watched_extensions")]
    pub watched_extensions: Vec<String>,
    /// How often the indexer checks the watcher for changes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Extra pause between files during a pass, on top of the scheduler yield.
    #[serde(default)]
    pub file_pause_ms: u64,
    /// Separator appended after every genre in the index.
    #[serde(default = "default_genre_delimiter")]
    pub genre_delimiter: String,
    /// Retry files whose tags could not be read after this many seconds even
    /// when they did not change. `None` retries only after a modification.
    #[serde(default)]
    pub retry_failed_after_secs: Option<u64>,
    /// Directory for the metadata cache and the error log.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Last folder bound for watching.
    #[serde(default)]
    pub watch_root: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            watched_extensions: default_watched_extensions(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            file_pause_ms: 0,
            genre_delimiter: default_genre_delimiter(),
            retry_failed_after_secs: None,
            data_dir: None,
            watch_root: None,
        }
    }
}

impl IndexerConfig {
    /// Clean up values loaded from disk so the rest of the crate can rely on them.
    pub fn normalized(mut self) -> Self {
        let mut extensions: Vec<String> = Vec::new();
        for ext in &self.watched_extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        if extensions.is_empty() {
            extensions = default_watched_extensions();
        }
        self.watched_extensions = extensions;
        self.poll_interval_ms = self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn file_pause(&self) -> Duration {
        Duration::from_millis(self.file_pause_ms)
    }

    pub fn retry_failed_after(&self) -> Option<Duration> {
        self.retry_failed_after_secs.map(Duration::from_secs)
    }

    /// Directory for the cache and error log, creating it if needed.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => {
                ensure_dir(dir)?;
                Ok(dir.clone())
            }
            None => app_dirs::data_dir().map_err(map_app_dir_error),
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn default_watched_extensions() -> Vec<String> {
    DEFAULT_WATCHED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_genre_delimiter() -> String {
    ",".to_string()
}
