use std::collections::HashSet;

use tracing::debug;

use crate::fs_ops::write_atomic;

use super::engine::{PassOutcome, PassReport};
use super::pass::PassContext;
use super::snapshot::{Snapshot, SnapshotEntry, now_epoch_ms, write_snapshot};
use super::{IndexError, IndexingEngine};

impl IndexingEngine {
    /// Persist the cache and, when anything changed, rewrite the snapshot,
    /// reconcile orphans and the error log.
    pub(super) fn finalize(&self, mut ctx: PassContext) -> Result<PassOutcome, IndexError> {
        let keys = self.watcher.file_keys();
        let mut report = PassReport {
            processed: ctx.total,
            extracted: ctx.extracted,
            failed: ctx.failed,
            vanished: ctx.vanished,
            errors_occurred: ctx.errors_occurred,
            ..PassReport::default()
        };

        // Hooks may call back into the engine; none fire while the cache is locked.
        let (dirty, orphans, records) = {
            let cache = self.lock_cache();
            cache.persist()?;
            let dirty: Vec<String> = cache
                .find_dirty()?
                .into_iter()
                .map(|record| record.file)
                .collect();
            let current: HashSet<String> = keys.iter().cloned().collect();
            let orphans = cache.find_orphans(&current)?;
            if dirty.is_empty() && orphans.is_empty() && !ctx.lost_entry {
                return Ok(if keys.is_empty() {
                    PassOutcome::NoMusic
                } else {
                    PassOutcome::NoChanges(report)
                });
            }
            let mut records = Vec::with_capacity(keys.len());
            for (index, key) in keys.iter().enumerate() {
                if let Some(record) = cache.get(key)? {
                    records.push((index, record));
                }
            }
            (dirty, orphans, records)
        };

        self.hooks.set_status("Indexing ... ");
        let mut entries = Vec::new();
        for (index, record) in records {
            if let Some(entry) = SnapshotEntry::from_record(&record) {
                self.hooks.set_status(&format!(
                    "Indexing {} of {}, {} {}",
                    index + 1,
                    keys.len(),
                    entry.artist,
                    entry.name
                ));
                entries.push(entry);
                continue;
            }
            if ctx.logged.contains(&record.file) {
                continue;
            }
            let line = match &record.tag_data {
                Some(data) => format!("{} isn't properly tagged", data.clipped_path),
                None => format!("{} has no tag data", record.file),
            };
            ctx.log_line(&record.file, line);
        }

        let snapshot = Snapshot::build(entries, now_epoch_ms())?;
        write_snapshot(self.watcher.root(), &snapshot)?;
        self.remember_index_date(snapshot.header.date);

        {
            let cache = self.lock_cache();
            cache.clear_dirty(&dirty)?;
            for orphan in &orphans {
                cache.remove(&orphan.file)?;
            }
            cache.persist()?;
        }

        let log_path = &self.options.log_path;
        write_atomic(log_path, ctx.log.join("\n").as_bytes())
            .map_err(|err| IndexError::io(log_path, err))?;
        debug!(
            path = %log_path.display(),
            lines = ctx.log.len(),
            "Wrote indexing error log"
        );

        report.removed = orphans.len();
        report.entries = snapshot.entries.len();
        report.hash = Some(snapshot.header.hash);
        Ok(PassOutcome::Indexed(report))
    }
}
