//! Host-facing orchestrator owning one watcher, cache and engine for a watch root.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use time::OffsetDateTime;
use tracing::info;

use crate::cache::{CACHE_FILE_NAME, CacheRecord, MetadataCache};
use crate::config::IndexerConfig;
use crate::hooks::IndexerHooks;
use crate::indexer::{EngineOptions, EngineState, IndexError, IndexingEngine, PassOutcome, Poller};
use crate::tags::TagReader;
use crate::watcher::DirectoryWatcher;

/// Indexes one watch root: change detection, background passes and output files.
pub struct IndexService {
    engine: Arc<IndexingEngine>,
    poller: Option<Poller>,
}

impl IndexService {
    /// Build the service for `root` without scanning or watching yet.
    ///
    /// Opens (or rebuilds) the metadata cache in the configured data directory.
    pub fn open(
        root: impl Into<PathBuf>,
        config: &IndexerConfig,
        reader: Box<dyn TagReader>,
        hooks: IndexerHooks,
    ) -> Result<Self, IndexError> {
        let config = config.clone().normalized();
        let data_dir = config.resolve_data_dir()?;
        let cache = MetadataCache::open(data_dir.join(CACHE_FILE_NAME))?;
        let watcher = Arc::new(DirectoryWatcher::new(root, &config.watched_extensions));
        watcher.on_status(hooks.status.clone());
        let options = EngineOptions::from_config(&config, &data_dir);
        let engine = Arc::new(IndexingEngine::new(watcher, cache, reader, options, hooks));
        Ok(Self {
            engine,
            poller: None,
        })
    }

    /// Open the service, scan the root, subscribe to changes and start polling.
    ///
    /// Fails without starting anything when the root is inaccessible.
    pub fn start(
        root: impl Into<PathBuf>,
        config: &IndexerConfig,
        reader: Box<dyn TagReader>,
        hooks: IndexerHooks,
    ) -> Result<Self, IndexError> {
        let mut service = Self::open(root, config, reader, hooks)?;
        service.engine.watcher().start()?;
        service.poller = Some(service.engine.start_polling()?);
        info!(root = %service.root().display(), "Index service started");
        Ok(service)
    }

    pub fn root(&self) -> &Path {
        self.engine.watcher().root()
    }

    pub fn engine(&self) -> &Arc<IndexingEngine> {
        &self.engine
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::is_running)
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Re-scan the root; `force_dirty` schedules a pass even when nothing changed.
    pub fn rescan(&self, force_dirty: bool) -> Result<(), IndexError> {
        self.engine.watcher().rescan(force_dirty)?;
        Ok(())
    }

    /// Run a pass on the calling thread instead of waiting for the next tick.
    pub fn run_pass_now(&self) -> Result<PassOutcome, IndexError> {
        self.engine.run_pass()
    }

    /// Delete the snapshot and status files and clear the cache.
    pub fn wipe(&self) -> Result<(), IndexError> {
        self.engine.wipe()
    }

    pub fn all_files(&self) -> Result<Vec<CacheRecord>, IndexError> {
        self.engine.all_files()
    }

    pub fn last_index_date(&self) -> Option<OffsetDateTime> {
        self.engine.last_index_date()
    }

    pub fn log_path(&self) -> &Path {
        self.engine.log_path()
    }

    pub fn error_count(&self) -> Result<usize, IndexError> {
        self.engine.error_count()
    }

    /// Stop polling and watching. A running pass completes first.
    pub fn stop(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.engine.watcher().stop();
    }
}

impl Drop for IndexService {
    fn drop(&mut self) {
        self.stop();
    }
}
