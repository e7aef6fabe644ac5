//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.
//!
//! The file is assembled under a temporary name and renamed into place only
//! after an fsync, so a crash mid-build never leaves a partial table visible
//! under a valid name.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Suffix appended to the final name while the table is being written.
/// `sstable_<g>.dat.tmp` can never be mistaken for a live table by the
/// startup directory scan.
const TMP_SUFFIX: &str = ".tmp";

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Name the table will carry once installed
    final_path: PathBuf,
    /// Name the bytes are written under until `finish`
    tmp_path: PathBuf,
    /// Buffered writer over the temp file
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Current write position (becomes each entry's index offset)
    current_offset: u64,
    /// Index: key -> file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    /// Running CRC hasher for the data block
    data_hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create a new SSTable builder targeting `path`.
    ///
    /// Writes the header immediately; call `add`/`add_tombstone` in strictly
    /// ascending key order, then `finish` to write index, footer, and install
    /// the file under its final name.
    pub fn new(path: &Path) -> Result<Self> {
        let final_path = path.to_path_buf();
        let mut tmp_name = final_path.as_os_str().to_os_string();
        tmp_name.push(TMP_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;

        Ok(Self {
            final_path,
            tmp_path,
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair (must be called in ascending key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_entry(key, Some(value))
    }

    /// Add a tombstone (must be called in ascending key order)
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_entry(key, None)
    }

    /// Internal: write an entry (value=None means tombstone)
    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.index.push((key.to_vec(), self.current_offset));

        let key_len = key.len() as u32;
        let val_len = match value {
            Some(v) => v.len() as u32,
            None => TOMBSTONE_MARKER,
        };

        let key_len_bytes = key_len.to_le_bytes();
        let val_len_bytes = val_len.to_le_bytes();

        self.writer.write_all(&key_len_bytes)?;
        self.writer.write_all(&val_len_bytes)?;
        self.writer.write_all(key)?;

        self.data_hasher.update(&key_len_bytes);
        self.data_hasher.update(&val_len_bytes);
        self.data_hasher.update(key);

        let mut entry_size: u64 = 8 + key.len() as u64;

        if let Some(v) = value {
            self.writer.write_all(v)?;
            self.data_hasher.update(v);
            entry_size += v.len() as u64;
        }

        self.current_offset += entry_size;
        self.entry_count += 1;

        Ok(())
    }

    /// Finish building: write index and footer, fsync, rename into place.
    ///
    /// Returns the number of entries written.
    pub fn finish(mut self) -> Result<u64> {
        let index_offset = self.current_offset;

        // Index block: [key_len(4)][offset(8)][key] per entry
        for (key, offset) in &self.index {
            let key_len = key.len() as u32;
            self.writer.write_all(&key_len.to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        let data_crc = self.data_hasher.finalize();

        // Footer: index_offset (8) + entry_count (8) + data_crc (4)
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&self.entry_count.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;

        self.writer.flush()?;
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        // Crash-atomic install: the table appears under its final name only
        // once every byte of it is durable.
        fs::rename(&self.tmp_path, &self.final_path)?;

        Ok(self.entry_count)
    }
}
