use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::paths::{is_watched_extension, to_unix_path};

use super::WatchError;

/// Walk `root` recursively and return the normalized keys of all watched audio files.
///
/// Keys are sorted so a fresh scan yields a stable processing order.
pub(super) fn scan_root(root: &Path, extensions: &[String]) -> Result<Vec<String>, WatchError> {
    if !root.is_dir() {
        return Err(WatchError::InvalidRoot(root.to_path_buf()));
    }
    let mut keys = Vec::new();
    visit_dir(root, &mut |path| {
        if is_watched_extension(path, extensions) {
            keys.push(to_unix_path(path));
        }
    })?;
    keys.sort();
    Ok(keys)
}

fn visit_dir(root: &Path, visitor: &mut impl FnMut(&Path)) -> Result<(), WatchError> {
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(
                    dir = %dir.display(),
                    error = %source,
                    "Failed to read directory during scan"
                );
                continue;
            }
            Err(source) => {
                return Err(WatchError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during scan"
                    );
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during scan"
                    );
                    continue;
                }
            };
            if file_type.is_symlink() {
                // Linked files count; linked directories are not followed.
                match fs::metadata(&path) {
                    Ok(meta) if meta.is_file() => visitor(&path),
                    Ok(_) => {}
                    Err(err) => debug!(
                        path = %path.display(),
                        error = %err,
                        "Skipping broken symlink during scan"
                    ),
                }
                continue;
            }
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                visitor(&path);
            }
        }
    }
    Ok(())
}
