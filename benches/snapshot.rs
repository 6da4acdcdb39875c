use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tuna_indexer::cache::{CacheRecord, MetadataCache};
use tuna_indexer::indexer::snapshot::{Snapshot, SnapshotEntry, content_hash};
use tuna_indexer::tags::TagData;

const ENTRY_COUNT: usize = 5_000;

fn entries() -> Vec<SnapshotEntry> {
    (0..ENTRY_COUNT)
        .map(|i| SnapshotEntry {
            album: format!("Album {}", i / 12),
            artist: format!("Artist {}", i / 120),
            name: format!("Track {i}"),
            path: format!("Artist {}/Album {}/{i:04}.mp3", i / 120, i / 12),
            year: Some(1970 + (i % 50) as i32),
            track: Some((i % 12) as u32 + 1),
            genres: "Rock,Pop,".to_string(),
            modified: Some(1_700_000_000_000 + i as i64),
        })
        .collect()
}

fn bench_snapshot(c: &mut Criterion) {
    let entries = entries();
    c.bench_with_input(
        BenchmarkId::new("content_hash", ENTRY_COUNT),
        &entries,
        |b, entries| b.iter(|| content_hash(black_box(entries)).expect("hash")),
    );
    let snapshot = Snapshot::build(entries.clone(), 1_700_000_000_000).expect("build");
    c.bench_with_input(
        BenchmarkId::new("render", ENTRY_COUNT),
        &snapshot,
        |b, snapshot| b.iter(|| black_box(snapshot).render().expect("render")),
    );
}

fn bench_cache_upsert(c: &mut Criterion) {
    let records: Vec<CacheRecord> = (0..ENTRY_COUNT)
        .map(|i| CacheRecord {
            file: format!("/music/{i:05}.mp3"),
            mtime_ns: Some(i as i64),
            modified_ms: Some(i as i64),
            checked_at_ms: 0,
            dirty: true,
            tag_data: Some(TagData {
                name: Some(format!("Track {i}")),
                album: Some("Album".into()),
                artist: Some("Artist".into()),
                track: None,
                year: None,
                genres: String::new(),
                clipped_path: format!("{i:05}.mp3"),
            }),
            is_valid: true,
        })
        .collect();
    c.bench_with_input(
        BenchmarkId::new("cache_upsert_persist", ENTRY_COUNT),
        &records,
        |b, records| {
            b.iter(|| {
                let cache = MetadataCache::open_in_memory().expect("cache open");
                for record in records {
                    cache.upsert(record).expect("upsert");
                }
                cache.persist().expect("persist");
            })
        },
    );
}

criterion_group!(benches, bench_snapshot, bench_cache_upsert);
criterion_main!(benches);
