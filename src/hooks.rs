//! Callbacks the indexer fires outward for a host UI.
//!
//! None of them are required for correctness; a missing hook is simply not
//! called.

use std::{fmt, sync::Arc};

/// Receives human-readable status text.
pub type StatusHook = Arc<dyn Fn(&str) + Send + Sync>;
/// Fired when an indexing pass starts or finishes.
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

/// Optional outward callbacks shared by the watcher and the indexing engine.
#[derive(Clone, Default)]
pub struct IndexerHooks {
    pub status: Option<StatusHook>,
    pub indexing_started: Option<LifecycleHook>,
    pub indexing_finished: Option<LifecycleHook>,
}

impl IndexerHooks {
    pub fn with_status(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.status = Some(Arc::new(hook));
        self
    }

    pub fn with_indexing_started(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.indexing_started = Some(Arc::new(hook));
        self
    }

    pub fn with_indexing_finished(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.indexing_finished = Some(Arc::new(hook));
        self
    }

    pub(crate) fn set_status(&self, text: &str) {
        if let Some(hook) = &self.status {
            hook(text);
        }
    }

    pub(crate) fn started(&self) {
        if let Some(hook) = &self.indexing_started {
            hook();
        }
    }

    pub(crate) fn finished(&self) {
        if let Some(hook) = &self.indexing_finished {
            hook();
        }
    }
}

impl fmt::Debug for IndexerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerHooks")
            .field("status", &self.status.is_some())
            .field("indexing_started", &self.indexing_started.is_some())
            .field("indexing_finished", &self.indexing_finished.is_some())
            .finish()
    }
}
