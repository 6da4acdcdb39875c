//! Whole-file replacement helpers shared by the config, snapshot and log writers.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

/// Prefix of the temporary files created next to a replaced file.
pub const TEMP_FILE_PREFIX: &str = ".tuna-tmp";

/// Replace `path` with `data` so readers only ever observe the old or the new contents.
///
/// The data is written to a temporary file in the destination directory,
/// flushed, then renamed over the destination. Missing parent directories are
/// created.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Delete a file, treating an already-missing file as success.
///
/// Returns true when a file was actually removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
