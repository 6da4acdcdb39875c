//! Diagnostic tracing for the indexer process.
//!
//! Each launch gets its own `tuna-indexer_<timestamp>.log` under the app logs
//! directory, mirrored to stdout. Only this crate's own launch logs are pruned;
//! anything else in the directory is left alone. The per-pass error log shown
//! to users (`output.log` in the data directory) is unrelated to this module.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing::warn;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Launch logs kept on disk, the current one included.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "tuna-indexer_";
const LOG_FILE_SUFFIX: &str = ".log";

const NAME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const DISPLAY_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

struct ActiveLog {
    path: PathBuf,
    _guard: WorkerGuard,
}

static ACTIVE_LOG: OnceLock<ActiveLog> = OnceLock::new();

/// Default filter when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    /// Debug output for the indexer, info for dependencies.
    Verbose,
}

impl Verbosity {
    fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Normal => "info",
            Verbosity::Verbose => "info,tuna_indexer=debug",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    Dirs(#[from] AppDirError),
    #[error("Failed to access log location {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file name: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// [`init_with`] at [`Verbosity::Normal`].
pub fn init() -> Result<PathBuf, LoggingError> {
    init_with(Verbosity::Normal)
}

/// Install the global subscriber and return this launch's log file.
///
/// Calling it again returns the file chosen by the first call. Errors are
/// for the host to report; the indexer runs fine without tracing.
pub fn init_with(verbosity: Verbosity) -> Result<PathBuf, LoggingError> {
    if let Some(active) = ACTIVE_LOG.get() {
        return Ok(active.path.clone());
    }
    let log_dir = app_dirs::logs_dir()?;
    let file_name = launch_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    touch(&log_path)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, &file_name));
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        DISPLAY_FORMAT,
    );
    let subscriber = Registry::default()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive())),
        )
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = ACTIVE_LOG.set(ActiveLog {
        path: log_path.clone(),
        _guard: guard,
    });

    // Pruning runs after the subscriber is up so failures are visible in the new log.
    let pruned = prune_launch_logs(&log_dir, MAX_LOG_FILES);
    tracing::info!(path = %log_path.display(), pruned, "Logging initialized");
    Ok(log_path)
}

/// Log file of the running process, once [`init_with`] succeeded.
pub fn current_log_file() -> Option<&'static Path> {
    ACTIVE_LOG.get().map(|active| active.path.as_path())
}

fn touch(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn is_launch_log(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX)
}

/// Delete the oldest launch logs beyond `keep`, returning how many went.
///
/// Launch log names embed their start time, so name order is age order.
/// A file that cannot be removed is reported and skipped.
fn prune_launch_logs(dir: &Path, keep: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "Could not list log directory");
            return 0;
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_launch_log(name))
        .collect();
    names.sort();

    let excess = names.len().saturating_sub(keep);
    let mut removed = 0;
    for name in names.iter().take(excess) {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => warn!(path = %path.display(), error = %err, "Could not remove old log"),
        }
    }
    removed
}

fn launch_file_name(started: OffsetDateTime) -> Result<String, LoggingError> {
    let stamp = started.format(NAME_FORMAT)?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}{LOG_FILE_SUFFIX}"))
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn launch_file_name_embeds_start_time() {
        let started = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            launch_file_name(started).unwrap(),
            "tuna-indexer_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn prune_keeps_newest_launch_logs_and_ignores_other_files() {
        let dir = tempdir().unwrap();
        for second in 0..12 {
            let started = OffsetDateTime::from_unix_timestamp(1_700_000_000 + second).unwrap();
            touch(&dir.path().join(launch_file_name(started).unwrap())).unwrap();
        }
        fs::write(dir.path().join("output.log"), b"kept").unwrap();
        fs::write(dir.path().join("notes.txt"), b"kept").unwrap();

        assert_eq!(prune_launch_logs(dir.path(), 10), 2);

        let mut launch_logs: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_launch_log(name))
            .collect();
        launch_logs.sort();
        assert_eq!(launch_logs.len(), 10);
        assert_eq!(launch_logs[0], "tuna-indexer_2023-11-14_22-13-22.log");
        assert!(dir.path().join("output.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn prune_of_missing_directory_removes_nothing() {
        let dir = tempdir().unwrap();
        assert_eq!(prune_launch_logs(&dir.path().join("missing"), 10), 0);
    }

    #[test]
    fn verbose_raises_only_this_crate() {
        assert_eq!(Verbosity::Normal.default_directive(), "info");
        assert_eq!(
            Verbosity::Verbose.default_directive(),
            "info,tuna_indexer=debug"
        );
    }
}
