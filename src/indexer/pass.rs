use std::{
    collections::HashSet,
    fs::Metadata,
    io,
    panic::{self, AssertUnwindSafe},
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::{debug, warn};

use crate::cache::CacheRecord;
use crate::paths::relative_to_root;
use crate::tags::{ExtractedTags, TagData, TagReadError, is_tag_valid};

use super::snapshot::now_epoch_ms;
use super::{IndexError, IndexingEngine};

/// Bookkeeping for one pass, handed from the per-file step to finalize.
#[derive(Debug, Default)]
pub(super) struct PassContext {
    pub(super) total: usize,
    pub(super) extracted: usize,
    pub(super) failed: usize,
    pub(super) vanished: usize,
    /// Human-readable lines for the error log.
    pub(super) log: Vec<String>,
    /// Keys already logged this pass.
    pub(super) logged: HashSet<String>,
    pub(super) errors_occurred: bool,
    /// A file that was in the index failed to read this pass.
    pub(super) lost_entry: bool,
}

impl PassContext {
    pub(super) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(super) fn log_line(&mut self, key: &str, line: String) {
        self.logged.insert(key.to_string());
        self.log.push(line);
    }
}

/// What to do with a file that is already in the cache.
enum CacheDecision {
    Hit,
    Extract { was_indexed: bool },
}

impl IndexingEngine {
    pub(super) fn process_file(
        &self,
        ctx: &mut PassContext,
        index: usize,
        key: &str,
    ) -> Result<(), IndexError> {
        let path = Path::new(key);
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.forget_vanished(ctx, key);
                return Ok(());
            }
            Err(err) => {
                warn!(path = %key, error = %err, "Could not stat file");
                ctx.errors_occurred = true;
                ctx.log_line(key, format!("{key} could not be read : {err}"));
                return Ok(());
            }
        };
        let mtime_ns = metadata.modified().ok().and_then(epoch_nanos);
        let now = now_epoch_ms();

        let cached = self.lock_cache().get(key)?;
        let was_indexed = match self.cache_decision(cached.as_ref(), mtime_ns, now) {
            CacheDecision::Hit => return Ok(()),
            CacheDecision::Extract { was_indexed } => was_indexed,
        };

        let mut record = CacheRecord {
            file: key.to_string(),
            mtime_ns,
            modified_ms: modified_ms(&metadata),
            checked_at_ms: now,
            dirty: false,
            tag_data: None,
            is_valid: false,
        };
        match self.read_tags(path) {
            Ok(tags) => {
                let clipped = relative_to_root(key, self.watcher.root());
                let data = TagData::from_extracted(&tags, clipped, &self.options.genre_delimiter);
                record.is_valid = is_tag_valid(&data);
                record.tag_data = Some(data);
                record.dirty = true;
                self.lock_cache().upsert(&record)?;
                ctx.extracted += 1;
                self.report_progress(ctx, index, &tags);
            }
            Err(TagReadError::Open { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                self.forget_vanished(ctx, key);
            }
            Err(err) => {
                debug!(path = %key, error = %err, "Tag extraction failed");
                self.lock_cache().upsert(&record)?;
                ctx.failed += 1;
                ctx.errors_occurred = true;
                ctx.lost_entry |= was_indexed;
                ctx.log_line(key, failure_line(key, &err));
            }
        }
        Ok(())
    }

    fn cache_decision(
        &self,
        cached: Option<&CacheRecord>,
        mtime_ns: Option<i64>,
        now_ms: i64,
    ) -> CacheDecision {
        let Some(record) = cached else {
            return CacheDecision::Extract { was_indexed: false };
        };
        let was_indexed = record.is_valid && record.tag_data.is_some();
        let unchanged = mtime_ns.is_some() && record.mtime_ns == mtime_ns;
        if unchanged && !self.retry_due(record, now_ms) {
            CacheDecision::Hit
        } else {
            CacheDecision::Extract { was_indexed }
        }
    }

    /// Failed records are retried without a modification only when the policy allows it.
    fn retry_due(&self, record: &CacheRecord, now_ms: i64) -> bool {
        if record.tag_data.is_some() {
            return false;
        }
        self.options.retry_failed_after.is_some_and(|after| {
            let elapsed = Duration::from_millis(
                u64::try_from(now_ms.saturating_sub(record.checked_at_ms)).unwrap_or_default(),
            );
            elapsed >= after
        })
    }

    /// Run the reader with panics contained to this file.
    fn read_tags(&self, path: &Path) -> Result<ExtractedTags, TagReadError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.reader.read(path))).unwrap_or_else(|_| {
            Err(TagReadError::Panicked {
                path: path.to_path_buf(),
            })
        })
    }

    fn forget_vanished(&self, ctx: &mut PassContext, key: &str) {
        debug!(path = %key, "File vanished before it could be indexed");
        self.watcher.remove(key);
        ctx.vanished += 1;
    }

    fn report_progress(&self, ctx: &PassContext, index: usize, tags: &ExtractedTags) {
        let percent = (index + 1) * 100 / ctx.total.max(1);
        self.hooks.set_status(&format!(
            "{percent}% {} - {}",
            tags.title.as_deref().unwrap_or_default(),
            tags.artist.as_deref().unwrap_or_default()
        ));
    }
}

fn failure_line(key: &str, err: &TagReadError) -> String {
    match err {
        TagReadError::TagFail { .. } => format!("{key} tag read fail. : {err}"),
        _ => format!("{key} could not be read, is it properly tagged? : {err}"),
    }
}

fn epoch_nanos(time: SystemTime) -> Option<i64> {
    let since = time.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since.as_nanos()).ok()
}

fn epoch_millis(time: SystemTime) -> Option<i64> {
    let since = time.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since.as_millis()).ok()
}

/// Later of the modification and creation times, in epoch milliseconds.
fn modified_ms(metadata: &Metadata) -> Option<i64> {
    metadata
        .modified()
        .ok()
        .into_iter()
        .chain(metadata.created().ok())
        .max()
        .and_then(epoch_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_conversions() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(epoch_millis(time), Some(1_500));
        assert_eq!(epoch_nanos(time), Some(1_500_000_000));
        assert_eq!(epoch_millis(UNIX_EPOCH - Duration::from_secs(1)), None);
    }

    #[test]
    fn failure_lines_name_the_file() {
        let fail = TagReadError::TagFail {
            path: "/m/a.mp3".into(),
            message: "bad frame".into(),
        };
        assert!(failure_line("/m/a.mp3", &fail).starts_with("/m/a.mp3 tag read fail. : "));
        let unreadable = TagReadError::Panicked {
            path: "/m/b.mp3".into(),
        };
        assert!(
            failure_line("/m/b.mp3", &unreadable)
                .starts_with("/m/b.mp3 could not be read, is it properly tagged? : ")
        );
    }
}
