use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tuna_indexer::{ExtractedTags, TagReadError, TagReader};

/// Fake tag reader: files hold `key=value` lines, `corrupt` fails the read.
#[derive(Clone, Default)]
pub struct ScriptedReader {
    calls: Arc<AtomicUsize>,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared call counter, still readable after the reader is boxed.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TagReader for ScriptedReader {
    fn read(&self, path: &Path) -> Result<ExtractedTags, TagReadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(path).map_err(|source| TagReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim() == "corrupt" {
            return Err(TagReadError::TagFail {
                path: path.to_path_buf(),
                message: "broken frame".into(),
            });
        }
        let mut tags = ExtractedTags::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "title" => tags.title = Some(value),
                "album" => tags.album = Some(value),
                "artist" => tags.artist = Some(value),
                "genre" => tags.genres.push(value),
                _ => {}
            }
        }
        Ok(tags)
    }
}
