//! The index snapshot and its status companion.
//!
//! The snapshot is UTF-8 JSON lines: a `{"date","hash"}` header followed by
//! one entry per valid file. The status file repeats the hash and date so a
//! remote reader can detect "no change" without fetching the snapshot.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cache::CacheRecord;
use crate::fs_ops::write_atomic;
use crate::paths::{index_path, status_path};

use super::IndexError;

/// One file in the snapshot. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub album: String,
    pub artist: String,
    pub name: String,
    /// Path relative to the watch root.
    pub path: String,
    pub year: Option<i32>,
    pub track: Option<u32>,
    pub genres: String,
    /// Epoch milliseconds, `null` when unknown.
    pub modified: Option<i64>,
}

impl SnapshotEntry {
    /// Entry for a cached record, `None` unless it has complete tag data.
    pub fn from_record(record: &CacheRecord) -> Option<Self> {
        let data = record.tag_data.as_ref()?;
        if !record.is_valid {
            return None;
        }
        Some(Self {
            album: data.album.clone()?,
            artist: data.artist.clone()?,
            name: data.name.clone()?,
            path: data.clipped_path.clone(),
            year: data.year,
            track: data.track,
            genres: data.genres.clone(),
            modified: record.modified_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub date: i64,
    pub hash: String,
}

/// Contents of the status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub hash: String,
    pub date: i64,
}

impl StatusRecord {
    pub fn date_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.date) * 1_000_000).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub header: SnapshotHeader,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Stamp the entries with `date` and their content hash.
    pub fn build(entries: Vec<SnapshotEntry>, date: i64) -> Result<Self, serde_json::Error> {
        let hash = content_hash(&entries)?;
        Ok(Self {
            header: SnapshotHeader { date, hash },
            entries,
        })
    }

    pub fn render(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string(&self.header)?;
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = serde_json::from_str(lines.next().unwrap_or_default())?;
        let entries = lines
            .map(serde_json::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { header, entries })
    }

    pub fn status(&self) -> StatusRecord {
        StatusRecord {
            hash: self.header.hash.clone(),
            date: self.header.date,
        }
    }
}

/// BLAKE3 hex digest of the JSON array of entries.
pub fn content_hash(entries: &[SnapshotEntry]) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(entries)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

pub fn now_epoch_ms() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}

/// Replace the snapshot, then the status file, under `root`.
///
/// The snapshot goes first so a reader that sees a new status always finds
/// the matching snapshot.
pub fn write_snapshot(root: &Path, snapshot: &Snapshot) -> Result<(), IndexError> {
    let index = index_path(root)?;
    let status = status_path(root)?;
    write_atomic(&index, snapshot.render()?.as_bytes()).map_err(|err| IndexError::io(&index, err))?;
    let status_json = serde_json::to_vec(&snapshot.status())?;
    write_atomic(&status, &status_json).map_err(|err| IndexError::io(&status, err))?;
    debug!(
        path = %index.display(),
        entries = snapshot.entries.len(),
        hash = %snapshot.header.hash,
        "Wrote index snapshot"
    );
    Ok(())
}

/// Read the status file under `root`.
///
/// A missing file yields `Ok(None)`; an unparsable one is logged and also
/// yields `None`.
pub fn read_status(root: &Path) -> Result<Option<StatusRecord>, IndexError> {
    let path = status_path(root)?;
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(IndexError::io(&path, err)),
    };
    match serde_json::from_str(&text) {
        Ok(status) => Ok(Some(status)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable status file");
            Ok(None)
        }
    }
}
