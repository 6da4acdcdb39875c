//! Canonical path forms and the well-known output files under a watch root.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Hidden filename of the generated index snapshot.
pub const INDEX_FILE_NAME: &str = ".tuna.dat";
/// Hidden filename of the small status file next to the snapshot.
pub const STATUS_FILE_NAME: &str = ".tuna.json";

/// Errors raised when deriving output paths.
#[derive(Debug, Error)]
pub enum PathError {
    /// No watch root has been bound.
    #[error("Invalid call - storage path not set")]
    RootNotSet,
}

/// Render a path with forward slashes regardless of platform.
pub fn to_unix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Location of the snapshot file for a watch root.
pub fn index_path(root: &Path) -> Result<PathBuf, PathError> {
    output_path(root, INDEX_FILE_NAME)
}

/// Location of the status file for a watch root.
pub fn status_path(root: &Path) -> Result<PathBuf, PathError> {
    output_path(root, STATUS_FILE_NAME)
}

fn output_path(root: &Path, name: &str) -> Result<PathBuf, PathError> {
    if root.as_os_str().is_empty() {
        return Err(PathError::RootNotSet);
    }
    Ok(root.join(name))
}

/// Path of `file` relative to `root`, slash-normalized and without a leading slash.
///
/// `file` is expected in the normalized form produced by [`to_unix_path`]. A
/// file outside the root is returned unchanged.
pub fn relative_to_root(file: &str, root: &Path) -> String {
    let root = to_unix_path(root);
    let root = root.trim_end_matches('/');
    match file.strip_prefix(root) {
        Some(rest) if root.is_empty() || rest.is_empty() || rest.starts_with('/') => {
            rest.trim_start_matches('/').to_string()
        }
        _ => file.to_string(),
    }
}

/// True when the path's extension is in the allow-list (case-insensitive, no dots).
pub fn is_watched_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|watched| ext.eq_ignore_ascii_case(watched))
}
