//! Tag data model, the completeness check and the extraction seam.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod reader;
mod validate;

pub use reader::SymphoniaTagReader;
pub use validate::is_tag_valid;

/// Fields a [`TagReader`] pulls out of one audio file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
}

/// Tag data as stored in the metadata cache and emitted into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    pub name: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub track: Option<u32>,
    pub year: Option<i32>,
    /// Genres joined with the configured delimiter.
    pub genres: String,
    /// Path relative to the watch root, slash-normalized.
    pub clipped_path: String,
}

impl TagData {
    pub fn from_extracted(tags: &ExtractedTags, clipped_path: String, genre_delimiter: &str) -> Self {
        Self {
            name: tags.title.clone(),
            album: tags.album.clone(),
            artist: tags.artist.clone(),
            track: tags.track_number,
            year: tags.year,
            genres: join_genres(&tags.genres, genre_delimiter),
            clipped_path,
        }
    }
}

/// Join genres with every entry followed by the delimiter (`"Rock,Pop,"`).
pub fn join_genres(genres: &[String], delimiter: &str) -> String {
    genres
        .iter()
        .map(|genre| format!("{genre}{delimiter}"))
        .collect()
}

/// Failure to extract tags from a single file.
#[derive(Debug, Error)]
pub enum TagReadError {
    /// The file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The container was recognized but its tag block is broken.
    #[error("Malformed tags in {path}: {message}")]
    TagFail { path: PathBuf, message: String },
    /// The file is not a readable audio container.
    #[error("Unreadable audio file {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
    /// The reader panicked while handling the file.
    #[error("Tag reader panicked on {path}")]
    Panicked { path: PathBuf },
}

impl TagReadError {
    pub fn path(&self) -> &Path {
        match self {
            TagReadError::Open { path, .. }
            | TagReadError::TagFail { path, .. }
            | TagReadError::Unreadable { path, .. }
            | TagReadError::Panicked { path } => path,
        }
    }
}

/// Reads embedded tags from an audio file without modifying it.
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<ExtractedTags, TagReadError>;
}

impl<T: TagReader + ?Sized> TagReader for Box<T> {
    fn read(&self, path: &Path) -> Result<ExtractedTags, TagReadError> {
        (**self).read(path)
    }
}

impl<T: TagReader + ?Sized> TagReader for std::sync::Arc<T> {
    fn read(&self, path: &Path) -> Result<ExtractedTags, TagReadError> {
        (**self).read(path)
    }
}
