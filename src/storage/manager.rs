//! Storage Manager
//!
//! Tracks the live SSTable set, newest first, and coordinates flushes and
//! compaction.
//!
//! The manifest is implicit: each live table is named `sstable_<g>.dat` and
//! its generation number `g` doubles as its recency rank. On startup the set
//! is rebuilt by scanning the data directory; temporary and foreign files
//! are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::memtable::{MemTable, Payload};

use super::merge::MergeIterator;
use super::sstable::{SSTableBuilder, SSTableReader};

/// Live SSTable filename shape: `sstable_<generation>.dat`
const SSTABLE_PREFIX: &str = "sstable_";
const SSTABLE_SUFFIX: &str = ".dat";

/// One live SSTable: its generation, its path, and an open reader
struct LiveTable {
    generation: u64,
    path: PathBuf,
    reader: SSTableReader,
}

/// Manages the live SSTable set
pub struct StorageManager {
    /// Directory the tables live in
    data_dir: PathBuf,

    /// Live tables, newest first (descending generation)
    tables: Vec<LiveTable>,

    /// Generation to assign to the next table; strictly increasing for the
    /// lifetime of the directory
    next_generation: u64,
}

impl StorageManager {
    /// Open storage in the given directory, rebuilding the live set from
    /// filenames.
    ///
    /// A file that matches the live naming shape but fails validation is a
    /// corruption error; it aborts the open rather than being skipped.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let mut found: Vec<(u64, PathBuf)> = Vec::new();

        for dir_entry in fs::read_dir(data_dir)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            if let Some(generation) = parse_generation(&name.to_string_lossy()) {
                found.push((generation, dir_entry.path()));
            }
        }

        // Newest first
        found.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let next_generation = found.first().map_or(0, |(max, _)| max + 1);

        let mut tables = Vec::with_capacity(found.len());
        for (generation, path) in found {
            let reader = SSTableReader::open(&path)?;
            tables.push(LiveTable {
                generation,
                path,
                reader,
            });
        }

        if !tables.is_empty() {
            tracing::info!(
                tables = tables.len(),
                next_generation,
                "loaded live SSTable set"
            );
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            tables,
            next_generation,
        })
    }

    /// Look up a key across the live set, newest table first.
    ///
    /// The first table that knows the key answers for it, tombstone or not.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Payload>> {
        for table in &mut self.tables {
            if !table.reader.might_contain(key) {
                continue;
            }
            if let Some(payload) = table.reader.get(key)? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Collect each table's entries in `start <= key <= end`, newest table
    /// first. One vec per table, each sorted ascending; the caller merges.
    pub fn range_scans(&mut self, start: &[u8], end: &[u8]) -> Result<Vec<Vec<(Vec<u8>, Payload)>>> {
        let mut scans = Vec::with_capacity(self.tables.len());
        for table in &mut self.tables {
            scans.push(table.reader.range(start, end)?);
        }
        Ok(scans)
    }

    /// Flush a memtable snapshot (tombstones included) into a new table at
    /// the head of the live set. Returns the new table's generation.
    pub fn flush(&mut self, memtable: &MemTable) -> Result<u64> {
        let generation = self.next_generation;
        self.next_generation += 1;

        let path = sstable_path(&self.data_dir, generation);
        let mut builder = SSTableBuilder::new(&path)?;

        for (key, payload) in memtable.iter() {
            match payload {
                Payload::Value(value) => builder.add(key, value)?,
                Payload::Tombstone => builder.add_tombstone(key)?,
            }
        }

        let entries = builder.finish()?;
        let reader = SSTableReader::open(&path)?;
        self.tables.insert(
            0,
            LiveTable {
                generation,
                path,
                reader,
            },
        );

        tracing::info!(generation, entries, "flushed memtable to SSTable");

        Ok(generation)
    }

    /// Merge every live table into a single new one.
    ///
    /// Newest wins on key ties. Because the merge always covers the whole
    /// live set, tombstones have nothing left to shadow and are dropped from
    /// the output. Input files are unlinked only after the replacement is
    /// installed; a crash in between leaves both visible and recovery
    /// prefers the higher generation.
    pub fn compact(&mut self) -> Result<()> {
        if self.tables.len() <= 1 {
            return Ok(());
        }

        let inputs = self.tables.len();
        let generation = self.next_generation;
        self.next_generation += 1;
        let path = sstable_path(&self.data_dir, generation);

        {
            let mut streams = Vec::with_capacity(self.tables.len());
            for table in self.tables.iter_mut() {
                streams.push(table.reader.iter()?);
            }

            let sources: Vec<Box<dyn Iterator<Item = Result<(Vec<u8>, Payload)>> + '_>> =
                streams.into_iter().map(|s| Box::new(s) as _).collect();

            let merge = MergeIterator::new(sources)?;
            let mut builder = SSTableBuilder::new(&path)?;

            for item in merge {
                let (key, payload) = item?;
                if let Payload::Value(value) = payload {
                    builder.add(&key, &value)?;
                }
            }

            builder.finish()?;
        }

        // Install the replacement, then retire the inputs.
        let reader = SSTableReader::open(&path)?;
        let old_tables = std::mem::replace(
            &mut self.tables,
            vec![LiveTable {
                generation,
                path,
                reader,
            }],
        );

        for table in old_tables {
            let LiveTable {
                generation: old_generation,
                path: old_path,
                reader: old_reader,
            } = table;
            // Close the handle before unlinking.
            drop(old_reader);
            if let Err(e) = fs::remove_file(&old_path) {
                tracing::warn!(
                    generation = old_generation,
                    "failed to remove compacted SSTable: {}",
                    e
                );
            }
        }

        tracing::info!(inputs, generation, "compacted live SSTable set");

        Ok(())
    }

    /// Number of live tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Live generations, newest first (for tests and debugging)
    pub fn generations(&self) -> Vec<u64> {
        self.tables.iter().map(|t| t.generation).collect()
    }
}

/// Full path of the table with the given generation
fn sstable_path(data_dir: &Path, generation: u64) -> PathBuf {
    data_dir.join(format!(
        "{}{}{}",
        SSTABLE_PREFIX, generation, SSTABLE_SUFFIX
    ))
}

/// Parse `sstable_<g>.dat` into `g`; anything else (including `.tmp`
/// leftovers from an interrupted install) is `None`.
fn parse_generation(name: &str) -> Option<u64> {
    name.strip_prefix(SSTABLE_PREFIX)?
        .strip_suffix(SSTABLE_SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generation() {
        assert_eq!(parse_generation("sstable_0.dat"), Some(0));
        assert_eq!(parse_generation("sstable_42.dat"), Some(42));
        assert_eq!(parse_generation("sstable_42.dat.tmp"), None);
        assert_eq!(parse_generation("wal.log"), None);
        assert_eq!(parse_generation("sstable_.dat"), None);
        assert_eq!(parse_generation("sstable_x.dat"), None);
    }
}
