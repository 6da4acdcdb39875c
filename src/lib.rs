//! Library exports for the indexer binary, benchmarks and tests.
/// Application directory helpers.
pub mod app_dirs;
/// SQLite-backed per-file metadata cache.
pub mod cache;
/// Persisted indexer settings.
pub mod config;
/// Atomic file replacement helpers.
pub mod fs_ops;
/// Outward callbacks for a host UI.
pub mod hooks;
/// Indexing engine, snapshot output and poll loop.
pub mod indexer;
/// Global tracing setup.
pub mod logging;
/// Canonical paths and output file locations.
pub mod paths;
/// Host-facing orchestrator.
pub mod service;
/// Tag model, validation and readers.
pub mod tags;
/// Directory scanning and change tracking.
pub mod watcher;

pub use cache::{CacheRecord, MetadataCache};
pub use config::IndexerConfig;
pub use hooks::IndexerHooks;
pub use indexer::{IndexError, IndexingEngine, PassOutcome, PassReport};
pub use service::IndexService;
pub use tags::{ExtractedTags, SymphoniaTagReader, TagData, TagReadError, TagReader};
pub use watcher::DirectoryWatcher;
