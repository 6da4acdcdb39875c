//! Live view of the audio files under a watch root.
//!
//! A full recursive scan seeds an insertion-ordered map of file keys; notify
//! events keep it current afterwards. Every accepted change flips a single
//! dirty flag, so bursts of events collapse into one indexing pass. The
//! watcher never reads tags.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use indexmap::IndexMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::hooks::StatusHook;
use crate::paths::{is_watched_extension, to_unix_path};

mod events;
mod scan;


pub use events::ChangeKind;

/// Status text shown while a full scan runs.
pub const SCANNING_STATUS: &str = "Scanning files, this can take a while ... ";

/// Errors raised while scanning or subscribing to a watch root.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The root is missing or not a directory.
    #[error("Watch root is not a directory: {0}")]
    InvalidRoot(PathBuf),
    /// Failed to read the root directory.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The filesystem change subscription could not be created.
    #[error("Failed to watch for changes: {0}")]
    Notify(#[from] notify::Error),
}

/// One audio file known to exist under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Absolute, slash-normalized path.
    pub file: String,
}

impl WatchedFile {
    fn new(file: String) -> Self {
        Self { file }
    }
}

#[derive(Debug, Default)]
struct WatchState {
    files: IndexMap<String, WatchedFile>,
    dirty: bool,
}

/// Maintains the set of audio files under a root and whether it changed.
pub struct DirectoryWatcher {
    root: PathBuf,
    extensions: Arc<[String]>,
    state: Arc<Mutex<WatchState>>,
    scanning: AtomicBool,
    status: Mutex<Option<StatusHook>>,
    subscription: Mutex<Option<RecommendedWatcher>>,
}

impl DirectoryWatcher {
    /// Create a watcher for `root` accepting the given extensions (lowercase, no dots).
    ///
    /// Nothing is scanned until [`start`](Self::start) or [`rescan`](Self::rescan).
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root,
            extensions: extensions.iter().cloned().collect(),
            state: Arc::new(Mutex::new(WatchState::default())),
            scanning: AtomicBool::new(false),
            status: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Register the status text callback.
    pub fn on_status(&self, hook: Option<StatusHook>) {
        *lock(&self.status) = hook;
    }

    /// Scan the root, mark the watcher dirty and subscribe to filesystem changes.
    ///
    /// Fails when the root is inaccessible; the caller must not start indexing then.
    pub fn start(&self) -> Result<(), WatchError> {
        if !self.root.is_dir() {
            return Err(WatchError::InvalidRoot(self.root.clone()));
        }
        self.rescan(false)?;
        self.mark_dirty();
        self.subscribe()?;
        info!(
            root = %self.root.display(),
            files = self.len(),
            "Watching folder for audio changes"
        );
        Ok(())
    }

    /// Drop the filesystem subscription. The file map is kept.
    pub fn stop(&self) {
        if lock(&self.subscription).take().is_some() {
            debug!(root = %self.root.display(), "Stopped watching folder");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    /// Replace the file map with the result of a fresh recursive scan.
    ///
    /// The map is swapped only once the scan completes; a failed scan leaves it
    /// untouched. The watcher becomes dirty when the scanned set differs from
    /// the previous one, or always when `force_dirty` is set. A call made
    /// while another scan is running returns immediately without effect.
    pub fn rescan(&self, force_dirty: bool) -> Result<(), WatchError> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(root = %self.root.display(), "Scan already running, skipping rescan");
            return Ok(());
        }
        let _scanning = ScanFlag(&self.scanning);

        self.set_status(SCANNING_STATUS);
        let result = scan::scan_root(&self.root, &self.extensions);
        self.set_status("");
        let keys = result?;

        let mut state = lock(&self.state);
        let changed = state.files.len() != keys.len()
            || keys.iter().any(|key| !state.files.contains_key(key));
        state.files = keys
            .into_iter()
            .map(|key| (key.clone(), WatchedFile::new(key)))
            .collect();
        if changed || force_dirty {
            state.dirty = true;
        }
        debug!(
            root = %self.root.display(),
            files = state.files.len(),
            changed,
            "Rescan complete"
        );
        Ok(())
    }

    /// Apply a single add/change/delete to the map.
    ///
    /// An added directory contributes every audio file beneath it and a deleted
    /// one drops every key under it. Other paths outside the extension
    /// allow-list are ignored. Returns whether the map was touched.
    pub fn register_change(&self, path: &Path, kind: ChangeKind) -> bool {
        register_change(&self.state, &self.extensions, path, kind)
    }

    /// Forget one file without rescanning, e.g. when it vanished before it could be read.
    pub fn remove(&self, file: &str) -> bool {
        lock(&self.state).files.shift_remove(file).is_some()
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.state).dirty
    }

    /// Clear the dirty flag, returning its previous value.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut lock(&self.state).dirty)
    }

    pub fn mark_dirty(&self) {
        lock(&self.state).dirty = true;
    }

    /// Snapshot of the current keys in insertion order.
    pub fn file_keys(&self) -> Vec<String> {
        lock(&self.state).files.keys().cloned().collect()
    }

    pub fn contains(&self, file: &str) -> bool {
        lock(&self.state).files.contains_key(file)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn subscribe(&self) -> Result<(), WatchError> {
        let state = Arc::clone(&self.state);
        let extensions = Arc::clone(&self.extensions);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for (path, kind) in events::changes_from_event(&event) {
                        register_change(&state, &extensions, &path, kind);
                    }
                }
                Err(err) => warn!(error = %err, "Filesystem watch error"),
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        *lock(&self.subscription) = Some(watcher);
        Ok(())
    }

    fn set_status(&self, text: &str) {
        let hook = lock(&self.status).clone();
        if let Some(hook) = hook {
            hook(text);
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn register_change(
    state: &Mutex<WatchState>,
    extensions: &[String],
    path: &Path,
    kind: ChangeKind,
) -> bool {
    if kind == ChangeKind::Add && path.is_dir() {
        return add_subtree(state, extensions, path);
    }
    if !is_watched_extension(path, extensions) {
        return kind == ChangeKind::Delete && remove_subtree(state, path);
    }
    let key = to_unix_path(path);
    let mut state = lock(state);
    match kind {
        ChangeKind::Delete => {
            state.files.shift_remove(&key);
        }
        ChangeKind::Add | ChangeKind::Change => {
            state
                .files
                .entry(key.clone())
                .or_insert_with(|| WatchedFile::new(key));
        }
    }
    state.dirty = true;
    true
}

/// A directory moved or created under the root: pick up every audio file inside it.
fn add_subtree(state: &Mutex<WatchState>, extensions: &[String], dir: &Path) -> bool {
    let keys = match scan::scan_root(dir, extensions) {
        Ok(keys) => keys,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "Failed to scan added directory");
            return false;
        }
    };
    if keys.is_empty() {
        return false;
    }
    let mut state = lock(state);
    for key in keys {
        state
            .files
            .entry(key.clone())
            .or_insert_with(|| WatchedFile::new(key));
    }
    state.dirty = true;
    true
}

/// A directory left the root: its path no longer exists, so drop keys by prefix.
fn remove_subtree(state: &Mutex<WatchState>, dir: &Path) -> bool {
    let mut prefix = to_unix_path(dir);
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    let mut state = lock(state);
    let before = state.files.len();
    state.files.retain(|key, _| !key.starts_with(&prefix));
    let removed = before - state.files.len();
    if removed == 0 {
        return false;
    }
    debug!(dir = %dir.display(), removed, "Directory removed from watch root");
    state.dirty = true;
    true
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// Clears the scanning flag when a rescan ends, including on error.
struct ScanFlag<'a>(&'a AtomicBool);

impl Drop for ScanFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
