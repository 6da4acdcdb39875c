use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::cache::{CacheRecord, MetadataCache};
use crate::config::IndexerConfig;
use crate::fs_ops::remove_if_exists;
use crate::hooks::IndexerHooks;
use crate::paths::{index_path, status_path};
use crate::tags::TagReader;
use crate::watcher::DirectoryWatcher;

use super::pass::PassContext;
use super::snapshot::read_status;
use super::state::{EngineState, PassTracker};
use super::IndexError;

/// Filename of the per-pass error log inside the data directory.
pub const ERROR_LOG_FILE_NAME: &str = "output.log";

/// Tunables for one engine, usually derived from [`IndexerConfig`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub genre_delimiter: String,
    pub poll_interval: Duration,
    /// Extra pause between files on top of the scheduler yield.
    pub file_pause: Duration,
    /// Re-read failed files after this long even without a modification.
    pub retry_failed_after: Option<Duration>,
    /// Where the per-pass error log is written.
    pub log_path: PathBuf,
}

impl EngineOptions {
    pub fn from_config(config: &IndexerConfig, data_dir: &Path) -> Self {
        Self {
            genre_delimiter: config.genre_delimiter.clone(),
            poll_interval: config.poll_interval(),
            file_pause: config.file_pause(),
            retry_failed_after: config.retry_failed_after(),
            log_path: data_dir.join(ERROR_LOG_FILE_NAME),
        }
    }
}

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The watcher saw no change since the last pass began.
    Clean,
    /// Another pass is still running.
    Busy,
}

/// Counters for a completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Keys captured at pass start.
    pub processed: usize,
    /// Files whose tags were read successfully.
    pub extracted: usize,
    /// Files whose tags could not be read.
    pub failed: usize,
    /// Files that vanished before they could be read.
    pub vanished: usize,
    /// Orphaned cache records removed.
    pub removed: usize,
    /// Entries written to the snapshot.
    pub entries: usize,
    /// Content hash of the written snapshot.
    pub hash: Option<String>,
    pub errors_occurred: bool,
}

/// Result of [`IndexingEngine::run_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Skipped(SkipReason),
    /// The watched folder holds no audio files and nothing needed removing.
    NoMusic,
    /// Files were checked but nothing in the index changed; no output was written.
    NoChanges(PassReport),
    /// A new snapshot and status file were written.
    Indexed(PassReport),
}

/// Runs indexing passes over the files a [`DirectoryWatcher`] reports.
///
/// One pass at a time: files are processed sequentially with a scheduler
/// yield in between, the cache is reconciled and the snapshot rewritten only
/// when something changed.
pub struct IndexingEngine {
    pub(super) watcher: Arc<DirectoryWatcher>,
    pub(super) cache: Mutex<MetadataCache>,
    pub(super) reader: Box<dyn TagReader>,
    pub(super) options: EngineOptions,
    pub(super) hooks: IndexerHooks,
    pub(super) tracker: PassTracker,
    last_index_date: Mutex<Option<OffsetDateTime>>,
}

impl IndexingEngine {
    pub fn new(
        watcher: Arc<DirectoryWatcher>,
        cache: MetadataCache,
        reader: Box<dyn TagReader>,
        options: EngineOptions,
        hooks: IndexerHooks,
    ) -> Self {
        Self {
            watcher,
            cache: Mutex::new(cache),
            reader,
            options,
            hooks,
            tracker: PassTracker::default(),
            last_index_date: Mutex::new(None),
        }
    }

    pub fn watcher(&self) -> &Arc<DirectoryWatcher> {
        &self.watcher
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> EngineState {
        self.tracker.state()
    }

    pub fn is_busy(&self) -> bool {
        self.tracker.is_busy()
    }

    /// Run one pass if the watcher is dirty and no pass is running.
    ///
    /// Per-file failures are logged and recorded; only cache or output I/O
    /// failures end the pass with an error, leaving the previous snapshot in place.
    pub fn run_pass(&self) -> Result<PassOutcome, IndexError> {
        if self.tracker.is_busy() {
            return Ok(PassOutcome::Skipped(SkipReason::Busy));
        }
        if !self.watcher.is_dirty() {
            return Ok(PassOutcome::Skipped(SkipReason::Clean));
        }
        let Some(guard) = self.tracker.try_begin() else {
            return Ok(PassOutcome::Skipped(SkipReason::Busy));
        };

        self.watcher.take_dirty();
        let keys = self.watcher.file_keys();
        info!(
            root = %self.watcher.root().display(),
            files = keys.len(),
            "Indexing pass started"
        );
        self.hooks.started();

        let result = self.index_keys(&guard, &keys);

        self.hooks.finished();
        drop(guard);

        match &result {
            Ok(PassOutcome::Indexed(report)) => {
                info!(
                    entries = report.entries,
                    extracted = report.extracted,
                    failed = report.failed,
                    removed = report.removed,
                    "Indexing complete"
                );
                if report.errors_occurred {
                    warn!(
                        log = %self.options.log_path.display(),
                        "Some files could not be indexed"
                    );
                }
                self.hooks.set_status("Indexing complete");
            }
            Ok(PassOutcome::NoChanges(_)) => {
                info!("No changes detected");
                self.hooks.set_status("No changes detected");
            }
            Ok(PassOutcome::NoMusic) => {
                info!(root = %self.watcher.root().display(), "Found no music");
                self.hooks.set_status("Found no music");
            }
            Ok(PassOutcome::Skipped(_)) => {}
            Err(err) => {
                warn!(error = %err, "Indexing pass failed");
                self.hooks.set_status(&format!("Indexing failed: {err}"));
            }
        }
        result
    }

    fn index_keys(
        &self,
        guard: &super::PassGuard<'_>,
        keys: &[String],
    ) -> Result<PassOutcome, IndexError> {
        let mut ctx = PassContext::new(keys.len());
        for (index, key) in keys.iter().enumerate() {
            if index > 0 {
                self.cooperative_pause();
            }
            self.process_file(&mut ctx, index, key)?;
        }
        guard.enter(EngineState::Finalizing);
        self.finalize(ctx)
    }

    fn cooperative_pause(&self) {
        std::thread::yield_now();
        if !self.options.file_pause.is_zero() {
            std::thread::sleep(self.options.file_pause);
        }
    }

    /// Delete the snapshot and status files and empty the cache.
    pub fn wipe(&self) -> Result<(), IndexError> {
        let root = self.watcher.root();
        for path in [index_path(root)?, status_path(root)?] {
            remove_if_exists(&path).map_err(|err| IndexError::io(&path, err))?;
        }
        {
            let cache = self.lock_cache();
            cache.clear()?;
            cache.persist()?;
        }
        *lock(&self.last_index_date) = None;
        info!(root = %root.display(), "Wiped index and metadata cache");
        Ok(())
    }

    /// Current cache contents, ordered by path.
    pub fn all_files(&self) -> Result<Vec<CacheRecord>, IndexError> {
        Ok(self.lock_cache().all()?)
    }

    /// Number of cached files that are not part of the index.
    pub fn error_count(&self) -> Result<usize, IndexError> {
        Ok(self
            .lock_cache()
            .all()?
            .iter()
            .filter(|record| !record.is_valid)
            .count())
    }

    /// When the snapshot was last written, read from the status file once and memoised.
    pub fn last_index_date(&self) -> Option<OffsetDateTime> {
        let mut cached = lock(&self.last_index_date);
        if cached.is_none() {
            *cached = match read_status(self.watcher.root()) {
                Ok(status) => status.and_then(|status| status.date_time()),
                Err(err) => {
                    warn!(error = %err, "Could not read index status");
                    None
                }
            };
        }
        *cached
    }

    pub(super) fn remember_index_date(&self, date_ms: i64) {
        *lock(&self.last_index_date) =
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(date_ms) * 1_000_000).ok();
    }

    /// Path of the per-pass error log.
    pub fn log_path(&self) -> &Path {
        &self.options.log_path
    }

    pub(super) fn lock_cache(&self) -> MutexGuard<'_, MetadataCache> {
        lock(&self.cache)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
