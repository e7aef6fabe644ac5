//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and the SSTable set
//! - Serialize all access under a single lock
//! - Trigger flushes when the MemTable is full, compaction when the
//!   SSTable set is full
//! - Crash recovery on startup

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, SableError};
use crate::memtable::{MemTable, Payload};
use crate::storage::{MergeIterator, StorageManager};
use crate::wal::{Operation, WalReader, WalWriter};

/// WAL filename within the data directory
const WAL_FILENAME: &str = "wal.log";

/// The main storage engine
///
/// ## Concurrency Model: Single Lock
///
/// One mutex guards the whole engine state. Every public operation - reads
/// included - locks it for the full duration of the call, so writes are
/// linearizable and a reader always observes a consistent snapshot.
///
/// Flush and compaction run on the calling thread while the lock is held;
/// a write that lands on a full memtable pays for the flush (and possibly a
/// compaction) before it returns. Public methods lock once and delegate to
/// [`EngineInner`], whose methods assume the lock is already held, so the
/// internal paths never re-lock.
pub struct Engine {
    inner: Mutex<EngineInner>,
}

/// Engine state guarded by the lock
struct EngineInner {
    /// Engine configuration
    config: Config,

    /// Write-ahead log for durability
    wal: WalWriter,

    /// In-memory table for recent writes
    memtable: MemTable,

    /// Live SSTable set, newest first
    storage: StorageManager,
}

impl Engine {
    /// Open or create an engine with the given config.
    ///
    /// Recovery sequence:
    /// 1. Create the data directory if missing
    /// 2. Scan it for SSTables and install them newest-first (a corrupt
    ///    table aborts the open)
    /// 3. Replay the WAL into a fresh memtable - values overwrite,
    ///    deletions write tombstones, nothing is appended back
    /// 4. Reopen the WAL in append mode with the LSN counter seeded past
    ///    the last replayed record
    ///
    /// After recovery the memtable overlay on the SSTable set reflects every
    /// acknowledged write; the WAL keeps its records until the next flush.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let storage = StorageManager::open(&config.data_dir)?;

        let wal_path = config.data_dir.join(WAL_FILENAME);
        let mut memtable = MemTable::new();
        let mut next_lsn = 1;

        if wal_path.exists() {
            let mut replayed = 0usize;
            for entry in WalReader::open(&wal_path)?.entries() {
                let entry = entry?;
                next_lsn = entry.lsn + 1;
                match entry.operation {
                    Operation::Put { key, value } => memtable.put(key, value),
                    Operation::Delete { key } => memtable.delete(key),
                }
                replayed += 1;
            }
            if replayed > 0 {
                tracing::info!(
                    records = replayed,
                    entries = memtable.len(),
                    "replayed WAL into memtable"
                );
            }
        }

        let wal = WalWriter::open(&wal_path, next_lsn)?;

        Ok(Self {
            inner: Mutex::new(EngineInner {
                config,
                wal,
                memtable,
                storage,
            }),
        })
    }

    /// Open with a path (convenience method using default config)
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Put a key-value pair.
    ///
    /// The record is appended to the WAL and fsynced before the memtable is
    /// touched; the call returns only after the sync, so an acknowledged put
    /// survives a crash.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_key(key)?;

        let mut inner = self.inner.lock();
        inner.wal.append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        inner.wal.sync()?;

        inner.memtable.put(key.to_vec(), value.to_vec());
        inner.maybe_flush()
    }

    /// Delete a key.
    ///
    /// Deleting an absent key is not an error: the tombstone still has to be
    /// recorded so it shadows any older SSTable entry for the key.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        check_key(key)?;

        let mut inner = self.inner.lock();
        inner.wal.append(Operation::Delete { key: key.to_vec() })?;
        inner.wal.sync()?;

        inner.memtable.delete(key.to_vec());
        inner.maybe_flush()
    }

    /// Get a value by key.
    ///
    /// Search order: memtable first (a tombstone hit answers "absent"
    /// without touching disk), then SSTables newest to oldest.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        self.inner.lock().get(key)
    }

    /// Put many key-value pairs with a single durability point.
    ///
    /// `keys` and `values` must have equal length; a mismatch is rejected
    /// before anything is written. Records are appended and applied in
    /// order, then the WAL is synced once; the batch is acknowledged only
    /// after that sync. A failure mid-batch leaves the records that did
    /// land, and recovery replays them.
    pub fn batch_put(&self, keys: &[Vec<u8>], values: &[Vec<u8>]) -> Result<()> {
        if keys.len() != values.len() {
            return Err(SableError::InvalidArgument(format!(
                "batch length mismatch: {} keys, {} values",
                keys.len(),
                values.len()
            )));
        }
        for key in keys {
            check_key(key)?;
        }

        let mut inner = self.inner.lock();
        for (key, value) in keys.iter().zip(values) {
            inner.wal.append(Operation::Put {
                key: key.clone(),
                value: value.clone(),
            })?;
            inner.memtable.put(key.clone(), value.clone());
        }
        inner.wal.sync()?;

        inner.maybe_flush()
    }

    /// Collect all live `(key, value)` pairs with `start <= key <= end`,
    /// ascending by key.
    ///
    /// Combines the memtable and every SSTable through a k-way merge;
    /// the newest source wins ties and tombstones suppress their key.
    /// An inverted range (`start > end`) is empty, not an error.
    pub fn get_range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        check_key(start)?;
        check_key(end)?;
        self.inner.lock().get_range(start, end)
    }

    /// Force a flush of the memtable regardless of its size
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Close the engine gracefully.
    ///
    /// Flushes the memtable if non-empty, truncates the WAL, and drops all
    /// file handles.
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.into_inner();
        inner.flush()?;
        // Normally a no-op: flush already truncated. Covers the case where
        // there was nothing to flush.
        inner.wal.truncate()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current memtable entry count
    pub fn memtable_len(&self) -> usize {
        self.inner.lock().memtable.len()
    }

    /// Number of live SSTables
    pub fn sstable_count(&self) -> usize {
        self.inner.lock().storage.table_count()
    }

    /// Live SSTable generations, newest first
    pub fn sstable_generations(&self) -> Vec<u64> {
        self.inner.lock().storage.generations()
    }
}

impl EngineInner {
    /// Point lookup. Caller holds the engine lock.
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.memtable.get(key) {
            Some(Payload::Value(value)) => return Ok(Some(value.clone())),
            Some(Payload::Tombstone) => return Ok(None),
            None => {}
        }

        match self.storage.get(key)? {
            Some(Payload::Value(value)) => Ok(Some(value)),
            Some(Payload::Tombstone) | None => Ok(None),
        }
    }

    /// Range scan. Caller holds the engine lock.
    fn get_range(&mut self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if start > end {
            return Ok(Vec::new());
        }

        let memtable_scan = self.memtable.range(start, end);
        let table_scans = self.storage.range_scans(start, end)?;

        // Sources ordered newest-first: the memtable, then tables in live
        // order. The merge resolves key ties toward the lowest rank.
        let mut sources: Vec<Box<dyn Iterator<Item = Result<(Vec<u8>, Payload)>>>> =
            Vec::with_capacity(1 + table_scans.len());
        sources.push(Box::new(memtable_scan.into_iter().map(Ok)));
        for scan in table_scans {
            sources.push(Box::new(scan.into_iter().map(Ok)));
        }

        let mut results = Vec::new();
        for item in MergeIterator::new(sources)? {
            let (key, payload) = item?;
            if let Payload::Value(value) = payload {
                results.push((key, value));
            }
        }

        Ok(results)
    }

    /// Flush if the memtable has reached the configured size.
    /// Caller holds the engine lock.
    fn maybe_flush(&mut self) -> Result<()> {
        if self.memtable.len() >= self.config.memtable_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the memtable into a new SSTable. Caller holds the engine lock.
    ///
    /// Ordering is what makes a crash at any step recoverable: the SSTable
    /// is durably installed before the memtable is cleared, and the WAL is
    /// truncated last. A crash before the truncate leaves WAL records that
    /// overlap the new table; replaying them into the memtable shadows the
    /// table with identical data.
    fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();
        self.wal.truncate()?;

        if self.storage.table_count() > self.config.compaction_threshold {
            self.storage.compact()?;
        }

        Ok(())
    }
}

/// Keys must be non-empty; checked before any I/O.
fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(SableError::InvalidArgument("empty key".to_string()));
    }
    Ok(())
}
