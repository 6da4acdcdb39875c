//! Symphonia-backed tag reader.

use std::{fs::File, path::Path};

use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey, Tag};
use symphonia::core::probe::Hint;

use super::{ExtractedTags, TagReadError, TagReader};

/// Reads ID3v2, MP4 and Vorbis comment tags through symphonia's probe.
///
/// Only the container header and metadata blocks are parsed; no audio is decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaTagReader;

impl SymphoniaTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for SymphoniaTagReader {
    fn read(&self, path: &Path) -> Result<ExtractedTags, TagReadError> {
        let file = File::open(path).map_err(|source| TagReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| map_probe_error(path, err))?;

        let mut tags = ExtractedTags::default();
        if let Some(revision) = probed.format.metadata().current() {
            apply_revision(&mut tags, revision);
        }
        if let Some(metadata) = probed.metadata.get()
            && let Some(revision) = metadata.current()
        {
            apply_revision(&mut tags, revision);
        }
        Ok(tags)
    }
}

fn map_probe_error(path: &Path, err: SymphoniaError) -> TagReadError {
    match err {
        SymphoniaError::DecodeError(message) => TagReadError::TagFail {
            path: path.to_path_buf(),
            message: message.to_string(),
        },
        other => TagReadError::Unreadable {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

fn apply_revision(tags: &mut ExtractedTags, revision: &MetadataRevision) {
    let mut album_artist = None;
    for tag in revision.tags() {
        let Some(key) = tag.std_key else {
            continue;
        };
        match key {
            StandardTagKey::TrackTitle => fill(&mut tags.title, tag),
            StandardTagKey::Album => fill(&mut tags.album, tag),
            StandardTagKey::Artist => fill(&mut tags.artist, tag),
            StandardTagKey::AlbumArtist => fill(&mut album_artist, tag),
            StandardTagKey::TrackNumber => {
                if tags.track_number.is_none() {
                    tags.track_number = parse_track_number(&tag.value.to_string());
                }
            }
            StandardTagKey::Date | StandardTagKey::ReleaseDate | StandardTagKey::OriginalDate => {
                if tags.year.is_none() {
                    tags.year = parse_year(&tag.value.to_string());
                }
            }
            StandardTagKey::Genre => {
                let genre = tag.value.to_string().trim().to_string();
                if !genre.is_empty() && !tags.genres.contains(&genre) {
                    tags.genres.push(genre);
                }
            }
            _ => {}
        }
    }
    if tags.artist.is_none() {
        tags.artist = album_artist;
    }
}

fn fill(slot: &mut Option<String>, tag: &Tag) {
    if slot.is_some() {
        return;
    }
    let text = tag.value.to_string();
    let text = text.trim();
    if !text.is_empty() {
        *slot = Some(text.to_string());
    }
}

/// Parse `"3"` or `"3/12"` into the track number.
fn parse_track_number(value: &str) -> Option<u32> {
    value
        .split('/')
        .next()
        .and_then(|number| number.trim().parse().ok())
        .filter(|number| *number > 0)
}

/// Parse the leading year out of `"1999"`, `"1999-05-01"` or `"1999-05-01T00:00:00"`.
fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn track_numbers_accept_totals() {
        assert_eq!(parse_track_number("3"), Some(3));
        assert_eq!(parse_track_number("07/12"), Some(7));
        assert_eq!(parse_track_number("0"), None);
        assert_eq!(parse_track_number("side A"), None);
    }

    #[test]
    fn years_come_from_leading_digits() {
        assert_eq!(parse_year("1999"), Some(1999));
        assert_eq!(parse_year("2004-05-01"), Some(2004));
        assert_eq!(parse_year("85"), None);
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempdir().unwrap();
        let err = SymphoniaTagReader::new()
            .read(&dir.path().join("missing.mp3"))
            .unwrap_err();
        assert!(matches!(err, TagReadError::Open { .. }));
    }

    #[test]
    fn non_audio_bytes_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"definitely not an audio stream").unwrap();
        let err = SymphoniaTagReader::new().read(&path).unwrap_err();
        assert!(!matches!(err, TagReadError::Open { .. }));
        assert_eq!(err.path(), path.as_path());
    }
}
