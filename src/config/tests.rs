use super::*;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().unwrap();
    let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, IndexerConfig::default());
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
    assert_eq!(config.genre_delimiter, ",");
    assert!(config.retry_failed_after().is_none());
}

#[test]
fn partial_file_keeps_defaults_for_missing_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "watched_extensions = [\".MP3\", \"flac\", \"\"]\npoll_interval_ms = 5\n",
    )
    .unwrap();

    let config = load_from(&path).unwrap();
    assert_eq!(config.watched_extensions, vec!["mp3", "flac"]);
    assert_eq!(config.poll_interval_ms, 50);
    assert_eq!(config.genre_delimiter, ",");
    assert_eq!(config.file_pause_ms, 0);
}

#[test]
fn empty_extension_list_falls_back_to_defaults() {
    let config = IndexerConfig {
        watched_extensions: vec![" ".into()],
        ..IndexerConfig::default()
    }
    .normalized();
    assert_eq!(config.watched_extensions.len(), DEFAULT_WATCHED_EXTENSIONS.len());
}

#[test]
fn invalid_toml_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
    let err = load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn saved_settings_load_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
    let config = IndexerConfig {
        retry_failed_after_secs: Some(600),
        data_dir: Some(PathBuf::from("/var/lib/tuna")),
        watch_root: Some(PathBuf::from("/music")),
        genre_delimiter: ";".into(),
        ..IndexerConfig::default()
    };
    save_to_path(&config, &path).unwrap();
    assert_eq!(load_from(&path).unwrap(), config);
}

#[test]
fn explicit_data_dir_is_created() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let config = IndexerConfig {
        data_dir: Some(data.clone()),
        ..IndexerConfig::default()
    };
    assert_eq!(config.resolve_data_dir().unwrap(), data);
    assert!(data.is_dir());
}
