use super::TagData;

/// True when a track carries the fields the index needs: album, artist and title.
pub fn is_tag_valid(tag: &TagData) -> bool {
    [&tag.album, &tag.artist, &tag.name]
        .iter()
        .all(|field| field.as_deref().is_some_and(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged() -> TagData {
        TagData {
            name: Some("Z".into()),
            album: Some("X".into()),
            artist: Some("Y".into()),
            track: None,
            year: None,
            genres: String::new(),
            clipped_path: "a.mp3".into(),
        }
    }

    #[test]
    fn complete_tags_are_valid() {
        assert!(is_tag_valid(&tagged()));
    }

    #[test]
    fn missing_or_blank_required_fields_are_invalid() {
        let mut no_album = tagged();
        no_album.album = None;
        assert!(!is_tag_valid(&no_album));

        let mut blank_artist = tagged();
        blank_artist.artist = Some("  ".into());
        assert!(!is_tag_valid(&blank_artist));

        let mut empty_name = tagged();
        empty_name.name = Some(String::new());
        assert!(!is_tag_valid(&empty_name));
    }

    #[test]
    fn optional_fields_do_not_affect_validity() {
        let mut tag = tagged();
        tag.year = Some(2001);
        tag.track = Some(1);
        tag.genres = "Rock,".into();
        assert!(is_tag_valid(&tag));
    }
}
