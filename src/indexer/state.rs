use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Phase of the indexing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    /// Walking the captured keys and extracting tags.
    Scanning,
    /// Writing the snapshot and reconciling the cache.
    Finalizing,
}

impl EngineState {
    fn as_u8(self) -> u8 {
        match self {
            EngineState::Idle => 0,
            EngineState::Scanning => 1,
            EngineState::Finalizing => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineState::Scanning,
            2 => EngineState::Finalizing,
            _ => EngineState::Idle,
        }
    }
}

/// Tracks pass lifecycles so passes never overlap.
///
/// A second trigger while a pass runs is dropped, not queued.
#[derive(Debug, Default)]
pub struct PassTracker {
    busy: AtomicBool,
    state: AtomicU8,
}

impl PassTracker {
    /// Claim the single pass slot. Returns `None` when a pass is already running.
    pub fn try_begin(&self) -> Option<PassGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.state
            .store(EngineState::Scanning.as_u8(), Ordering::Release);
        Some(PassGuard { tracker: self })
    }

    /// True while a pass holds the slot.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Holds the pass slot; releasing it returns the tracker to idle.
#[derive(Debug)]
pub struct PassGuard<'a> {
    tracker: &'a PassTracker,
}

impl PassGuard<'_> {
    /// Move the running pass to another phase.
    pub fn enter(&self, state: EngineState) {
        self.tracker.state.store(state.as_u8(), Ordering::Release);
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.tracker
            .state
            .store(EngineState::Idle.as_u8(), Ordering::Release);
        self.tracker.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevents_overlapping_passes() {
        let tracker = PassTracker::default();
        let guard = tracker.try_begin().unwrap();
        assert!(tracker.is_busy());
        assert!(tracker.try_begin().is_none());
        drop(guard);
        assert!(!tracker.is_busy());
        assert!(tracker.try_begin().is_some());
    }

    #[test]
    fn phases_return_to_idle_on_release() {
        let tracker = PassTracker::default();
        assert_eq!(tracker.state(), EngineState::Idle);
        let guard = tracker.try_begin().unwrap();
        assert_eq!(tracker.state(), EngineState::Scanning);
        guard.enter(EngineState::Finalizing);
        assert_eq!(tracker.state(), EngineState::Finalizing);
        drop(guard);
        assert_eq!(tracker.state(), EngineState::Idle);
    }
}
