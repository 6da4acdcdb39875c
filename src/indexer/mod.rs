//! Incremental indexing: per-file extraction passes, snapshot output and the poll loop.

mod engine;
mod errors;
mod finalize;
mod pass;
mod poller;
/// Snapshot and status file model.
pub mod snapshot;
mod state;


pub use engine::{
    ERROR_LOG_FILE_NAME, EngineOptions, IndexingEngine, PassOutcome, PassReport, SkipReason,
};
pub use errors::IndexError;
pub use poller::Poller;
pub use snapshot::{Snapshot, SnapshotEntry, StatusRecord};
pub use state::{EngineState, PassGuard, PassTracker};
