mod support;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use support::env::IndexerHomeGuard;
use support::files::{set_file_times, wait_until, write_song};
use support::reader::ScriptedReader;
use tempfile::{TempDir, tempdir};
use tuna_indexer::indexer::{ERROR_LOG_FILE_NAME, Snapshot};
use tuna_indexer::watcher::WatchError;
use tuna_indexer::{IndexError, IndexService, IndexerConfig, IndexerHooks, PassOutcome};

struct Library {
    dir: TempDir,
    root: PathBuf,
    config: IndexerConfig,
}

impl Library {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().join("music");
        std::fs::create_dir_all(&root).unwrap();
        let config = IndexerConfig {
            poll_interval_ms: 50,
            data_dir: Some(dir.path().join("data")),
            ..IndexerConfig::default()
        };
        Self { dir, root, config }
    }

    fn open(&self, reader: &ScriptedReader) -> IndexService {
        IndexService::open(
            &self.root,
            &self.config,
            Box::new(reader.clone()),
            IndexerHooks::default(),
        )
        .unwrap()
    }

    fn snapshot(&self) -> Snapshot {
        let text = std::fs::read_to_string(self.root.join(".tuna.dat")).unwrap();
        Snapshot::parse(&text).unwrap()
    }

    fn log_text(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("data").join(ERROR_LOG_FILE_NAME))
            .unwrap_or_default()
    }
}

fn run_once(service: &IndexService) -> PassOutcome {
    service.rescan(false).unwrap();
    service.engine().watcher().mark_dirty();
    service.run_pass_now().unwrap()
}

fn entry_count(library: &Library) -> usize {
    if !library.root.join(".tuna.dat").exists() {
        return 0;
    }
    library.snapshot().entries.len()
}

#[test]
fn tagged_and_untagged_files_end_up_in_snapshot_and_log() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    std::fs::write(library.root.join("b.mp3"), "").unwrap();
    std::fs::write(library.root.join("notes.txt"), "ignored").unwrap();
    let reader = ScriptedReader::new();
    let service = library.open(&reader);

    let outcome = run_once(&service);
    assert!(matches!(outcome, PassOutcome::Indexed(_)));

    let snapshot = library.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].path, "a.mp3");
    assert!(!snapshot.header.hash.is_empty());

    let log = library.log_text();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("b.mp3"));
    assert_eq!(service.error_count().unwrap(), 1);
    assert_eq!(service.all_files().unwrap().len(), 2);
}

#[test]
fn cache_hits_follow_modification_time_only() {
    let library = Library::new();
    let song = library.root.join("a.mp3");
    write_song(&song, "Z", "X", "Y");
    set_file_times(&song, 1_600_000_000, 0);
    let reader = ScriptedReader::new();
    let calls = reader.calls();
    let service = library.open(&reader);
    run_once(&service);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    write_song(&song, "Changed", "X", "Y");
    set_file_times(&song, 1_600_000_000, 0);
    assert!(matches!(run_once(&service), PassOutcome::NoChanges(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(library.snapshot().entries[0].name, "Z");

    set_file_times(&song, 1_600_000_100, 0);
    assert!(matches!(run_once(&service), PassOutcome::Indexed(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(library.snapshot().entries[0].name, "Changed");
}

#[test]
fn idempotent_passes_keep_the_hash() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    write_song(&library.root.join("b.mp3"), "W", "X", "Y");
    let reader = ScriptedReader::new();
    let service = library.open(&reader);

    let PassOutcome::Indexed(first) = run_once(&service) else {
        panic!("first pass should index");
    };
    let status_before = std::fs::read(library.root.join(".tuna.json")).unwrap();
    assert!(matches!(run_once(&service), PassOutcome::NoChanges(_)));
    assert_eq!(std::fs::read(library.root.join(".tuna.json")).unwrap(), status_before);
    assert_eq!(Some(library.snapshot().header.hash), first.hash);
}

#[test]
fn deleting_the_last_file_writes_an_empty_snapshot() {
    let library = Library::new();
    let song = library.root.join("a.mp3");
    write_song(&song, "Z", "X", "Y");
    let reader = ScriptedReader::new();
    let service = library.open(&reader);
    run_once(&service);

    std::fs::remove_file(&song).unwrap();
    let PassOutcome::Indexed(report) = run_once(&service) else {
        panic!("deletion should regenerate the snapshot");
    };
    assert_eq!(report.removed, 1);
    assert_eq!(entry_count(&library), 0);
    assert!(service.all_files().unwrap().is_empty());
}

#[test]
fn wipe_removes_index_status_and_cache() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    let reader = ScriptedReader::new();
    let service = library.open(&reader);
    run_once(&service);
    assert!(service.last_index_date().is_some());

    service.wipe().unwrap();
    assert!(!library.root.join(".tuna.dat").exists());
    assert!(!library.root.join(".tuna.json").exists());
    assert!(service.all_files().unwrap().is_empty());
    assert!(service.last_index_date().is_none());
}

#[test]
fn cache_survives_restart() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    let reader = ScriptedReader::new();
    let calls = reader.calls();
    {
        let service = library.open(&reader);
        run_once(&service);
    }
    let service = library.open(&reader);
    assert!(service.last_index_date().is_some());
    assert!(matches!(run_once(&service), PassOutcome::NoChanges(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn default_data_dir_lives_under_indexer_home() {
    let home = tempdir().unwrap();
    let _guard = IndexerHomeGuard::set(home.path().to_path_buf());
    let library = Library::new();
    let config = IndexerConfig {
        data_dir: None,
        ..library.config.clone()
    };
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");

    let data = home.path().join(".tuna-indexer").join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("cache.db"), vec![0xA5u8; 4096]).unwrap();

    let service = IndexService::open(
        &library.root,
        &config,
        Box::new(ScriptedReader::new()),
        IndexerHooks::default(),
    )
    .unwrap();
    assert!(matches!(run_once(&service), PassOutcome::Indexed(_)));
    assert_eq!(service.log_path(), data.join(ERROR_LOG_FILE_NAME).as_path());
    assert_eq!(service.all_files().unwrap().len(), 1);
}

#[test]
fn start_rejects_missing_root() {
    let library = Library::new();
    let missing = library.dir.path().join("missing");
    let err = IndexService::start(
        &missing,
        &library.config,
        Box::new(ScriptedReader::new()),
        IndexerHooks::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, IndexError::Watch(WatchError::InvalidRoot(_))));
}

#[test]
fn running_service_picks_up_new_files() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&statuses);
    let hooks = IndexerHooks::default().with_status(move |text| {
        sink.lock().unwrap().push(text.to_string());
    });
    let mut service = IndexService::start(
        &library.root,
        &library.config,
        Box::new(ScriptedReader::new()),
        hooks,
    )
    .unwrap();
    assert!(service.is_polling());

    assert!(wait_until(Duration::from_secs(10), || entry_count(&library) == 1));
    write_song(&library.root.join("c.mp3"), "New", "X", "Y");
    assert!(wait_until(Duration::from_secs(15), || entry_count(&library) == 2));

    service.stop();
    assert!(!service.is_polling());
    let statuses = statuses.lock().unwrap();
    assert!(statuses.iter().any(|text| text == "Indexing complete"));
    assert!(
        statuses
            .iter()
            .any(|text| text.starts_with("Scanning files"))
    );
}

#[test]
fn manual_rescan_forces_a_pass() {
    let library = Library::new();
    write_song(&library.root.join("a.mp3"), "Z", "X", "Y");
    let reader = ScriptedReader::new();
    let service = library.open(&reader);
    run_once(&service);
    assert_eq!(
        service.run_pass_now().unwrap(),
        PassOutcome::Skipped(tuna_indexer::indexer::SkipReason::Clean)
    );

    service.rescan(true).unwrap();
    assert!(matches!(
        service.run_pass_now().unwrap(),
        PassOutcome::NoChanges(_)
    ));
    assert_eq!(service.root(), library.root.as_path());
}
