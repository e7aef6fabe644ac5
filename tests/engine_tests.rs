//! Tests for the Engine
//!
//! These tests verify:
//! - Basic put/get/delete/batch/range operations
//! - Flush and compaction triggers
//! - Crash recovery from the WAL
//! - Observable state across flush and compaction boundaries
//! - Argument validation
//! - Concurrent access
//! - Engine lifecycle (open/close)

use std::path::Path;
use std::sync::Arc;
use std::thread;

use sablekv::{Config, Engine, SableError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1024, 10);
    (temp_dir, engine)
}

fn open_engine(dir: &Path, memtable_size: usize, compaction_threshold: usize) -> Engine {
    let config = Config::builder()
        .data_dir(dir)
        .memtable_size(memtable_size)
        .compaction_threshold(compaction_threshold)
        .build();
    Engine::open(config).unwrap()
}

fn sstable_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("sstable_") && name.ends_with(".dat"))
        .count()
}

fn pairs(raw: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    raw.iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"alpha", b"1").unwrap();
    engine.put(b"beta", b"2").unwrap();

    assert_eq!(engine.get(b"alpha").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"beta").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"gamma").unwrap(), None);
}

#[test]
fn test_open_path_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    engine.put(b"k", b"v").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"x", b"a").unwrap();
    engine.put(b"x", b"b").unwrap();

    assert_eq!(engine.get(b"x").unwrap(), Some(b"b".to_vec()));
}

#[test]
fn test_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();
    engine.delete(b"key").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), None);
}

#[test]
fn test_delete_absent_key_is_not_an_error() {
    let (_temp, engine) = setup_temp_engine();

    engine.delete(b"never-written").unwrap();
    assert_eq!(engine.get(b"never-written").unwrap(), None);
}

#[test]
fn test_put_delete_put_roundtrip() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"k", b"v1").unwrap();
    engine.delete(b"k").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), None);

    engine.put(b"k", b"v2").unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

// =============================================================================
// Argument Validation Tests
// =============================================================================

#[test]
fn test_empty_key_is_rejected() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.put(b"", b"v"),
        Err(SableError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.get(b""),
        Err(SableError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.delete(b""),
        Err(SableError::InvalidArgument(_))
    ));
}

#[test]
fn test_batch_put_length_mismatch_writes_nothing() {
    let (_temp, engine) = setup_temp_engine();

    let keys = vec![b"a".to_vec(), b"b".to_vec()];
    let values = vec![b"1".to_vec()];

    assert!(matches!(
        engine.batch_put(&keys, &values),
        Err(SableError::InvalidArgument(_))
    ));

    // Rejected before any write took effect
    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.memtable_len(), 0);
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_triggered_by_memtable_size() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 2, 10);

    engine.put(b"k1", b"v1").unwrap();
    assert_eq!(engine.sstable_count(), 0);

    engine.put(b"k2", b"v2").unwrap();
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.memtable_len(), 0);
}

#[test]
fn test_delete_shadows_sstable_entry() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 2, 10);

    engine.put(b"k1", b"v1").unwrap();
    engine.put(b"k2", b"v2").unwrap(); // triggers flush

    engine.delete(b"k1").unwrap();

    assert_eq!(engine.get(b"k1").unwrap(), None);
    assert_eq!(engine.get(b"k2").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_forced_flushes_do_not_change_observable_state() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.flush().unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.flush().unwrap();
    engine.delete(b"a").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(
        engine.get_range(b"a", b"z").unwrap(),
        pairs(&[("b", "2")])
    );
}

#[test]
fn test_flush_with_empty_memtable_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1024, 10);

    engine.flush().unwrap();
    assert_eq!(sstable_file_count(temp_dir.path()), 0);
}

#[test]
fn test_tombstone_survives_flush() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1024, 10);

    engine.put(b"k", b"v").unwrap();
    engine.flush().unwrap();
    engine.delete(b"k").unwrap();
    engine.flush().unwrap();

    // Both layers are on disk now; the newer tombstone must win
    assert_eq!(engine.get(b"k").unwrap(), None);

    engine.close().unwrap();
    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"k").unwrap(), None);
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_put_visible_after_commit() {
    let (_temp, engine) = setup_temp_engine();

    let keys = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
    let values = vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()];
    engine.batch_put(&keys, &values).unwrap();

    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"c").unwrap(), Some(b"3".to_vec()));
}

#[test]
fn test_batch_put_survives_crash() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        let keys = vec![b"a".to_vec(), b"b".to_vec()];
        let values = vec![b"1".to_vec(), b"2".to_vec()];
        engine.batch_put(&keys, &values).unwrap();
        // Dropped without close: the WAL is all that survives
    }

    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_batch_put_can_trigger_flush() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 2, 10);

    let keys = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
    let values = vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()];
    engine.batch_put(&keys, &values).unwrap();

    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
}

// =============================================================================
// Range Tests
// =============================================================================

#[test]
fn test_range_across_memtable_and_sstable() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 3, 10);

    engine.put(b"b", b"B").unwrap();
    engine.put(b"d", b"D").unwrap();
    engine.put(b"f", b"F").unwrap(); // triggers flush
    engine.put(b"c", b"C").unwrap();
    engine.put(b"e", b"E").unwrap();

    assert_eq!(
        engine.get_range(b"a", b"z").unwrap(),
        pairs(&[("b", "B"), ("c", "C"), ("d", "D"), ("e", "E"), ("f", "F")])
    );
}

#[test]
fn test_range_bounds_are_inclusive() {
    let (_temp, engine) = setup_temp_engine();

    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")] {
        engine.put(k.as_bytes(), v.as_bytes()).unwrap();
    }

    assert_eq!(
        engine.get_range(b"b", b"c").unwrap(),
        pairs(&[("b", "2"), ("c", "3")])
    );
}

#[test]
fn test_range_hides_deleted_keys() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 2, 10);

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap(); // triggers flush
    engine.delete(b"a").unwrap();

    assert_eq!(engine.get_range(b"a", b"z").unwrap(), pairs(&[("b", "2")]));
}

#[test]
fn test_range_prefers_newest_version_of_a_key() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1, 10);

    engine.put(b"k", b"old").unwrap(); // flushed immediately
    engine.put(b"k", b"new").unwrap(); // flushed immediately

    let result = engine.get_range(b"a", b"z").unwrap();
    assert_eq!(result, pairs(&[("k", "new")]));
}

#[test]
fn test_inverted_range_is_empty() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"k", b"v").unwrap();
    assert!(engine.get_range(b"z", b"a").unwrap().is_empty());
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_compaction_converges_to_one_table() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1, 3);

    engine.put(b"k", b"v1").unwrap();
    engine.put(b"k", b"v2").unwrap();
    engine.put(b"k", b"v3").unwrap();
    engine.put(b"k", b"v4").unwrap(); // fourth flush exceeds the threshold

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v4".to_vec()));
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(sstable_file_count(temp_dir.path()), 1);
}

#[test]
fn test_compaction_preserves_observable_state() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1, 3);

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.delete(b"a").unwrap();
    engine.put(b"c", b"3").unwrap(); // triggers compaction

    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.get(b"a").unwrap(), None);
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"c").unwrap(), Some(b"3".to_vec()));
    assert_eq!(
        engine.get_range(b"a", b"z").unwrap(),
        pairs(&[("b", "2"), ("c", "3")])
    );
}

#[test]
fn test_generations_keep_climbing_after_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1, 2);

    engine.put(b"a", b"1").unwrap(); // gen 0
    engine.put(b"b", b"2").unwrap(); // gen 1
    engine.put(b"c", b"3").unwrap(); // gen 2, then compaction -> gen 3

    assert_eq!(engine.sstable_generations(), vec![3]);

    engine.put(b"d", b"4").unwrap(); // gen 4
    assert_eq!(engine.sstable_generations(), vec![4, 3]);
}

// =============================================================================
// Crash Recovery Tests
// =============================================================================

#[test]
fn test_crash_recovery_replays_wal() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
        // Dropped without close - simulates a crash before any flush
    }

    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(
        engine.get_range(b"a", b"b").unwrap(),
        pairs(&[("a", "1"), ("b", "2")])
    );
}

#[test]
fn test_recovery_keeps_data_in_memtable_only() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"a", b"1").unwrap();
    }

    let engine = open_engine(temp_dir.path(), 1024, 10);

    // Replay populates the memtable; no SSTable is written during recovery
    assert_eq!(engine.sstable_count(), 0);
    assert_eq!(engine.memtable_len(), 1);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_recovery_replays_deletes() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"k", b"v").unwrap();
        engine.flush().unwrap();
        engine.delete(b"k").unwrap();
        // Crash: the tombstone lives only in the WAL
    }

    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"k").unwrap(), None);
}

#[test]
fn test_recovery_after_flush_and_more_writes() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"flushed", b"1").unwrap();
        engine.flush().unwrap();
        engine.put(b"pending", b"2").unwrap();
    }

    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"flushed").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"pending").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_repeated_crash_reopen_is_stable() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"k", b"v").unwrap();
    }

    // Replay, then crash again without writing; state must not drift
    for _ in 0..3 {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_flushes_and_empties_wal() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1024, 10);
        engine.put(b"k", b"v").unwrap();
        engine.close().unwrap();
    }

    let wal_len = std::fs::metadata(temp_dir.path().join("wal.log"))
        .unwrap()
        .len();
    assert_eq!(wal_len, 0);
    assert_eq!(sstable_file_count(temp_dir.path()), 1);

    let engine = open_engine(temp_dir.path(), 1024, 10);
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.memtable_len(), 0);
}

#[test]
fn test_close_with_empty_memtable() {
    let temp_dir = TempDir::new().unwrap();

    let engine = open_engine(temp_dir.path(), 1024, 10);
    engine.close().unwrap();

    let wal_len = std::fs::metadata(temp_dir.path().join("wal.log"))
        .unwrap()
        .len();
    assert_eq!(wal_len, 0);
}

#[test]
fn test_open_rejects_zero_thresholds() {
    let temp_dir = TempDir::new().unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size(0)
        .build();
    assert!(matches!(Engine::open(config), Err(SableError::Config(_))));

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_threshold(0)
        .build();
    assert!(matches!(Engine::open(config), Err(SableError::Config(_))));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(open_engine(temp_dir.path(), 64, 4));

    let mut handles = Vec::new();
    for writer_id in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..50u32 {
                let key = format!("w{}k{}", writer_id, i);
                let val = format!("v{}", i);
                engine.put(key.as_bytes(), val.as_bytes()).unwrap();
                engine.get(key.as_bytes()).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every acknowledged write is visible afterwards
    for writer_id in 0..4 {
        for i in 0..50u32 {
            let key = format!("w{}k{}", writer_id, i);
            let val = format!("v{}", i);
            assert_eq!(
                engine.get(key.as_bytes()).unwrap(),
                Some(val.into_bytes()),
                "missing {}",
                key
            );
        }
    }
}
