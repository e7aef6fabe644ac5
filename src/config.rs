//! Configuration for sablekv
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{Result, SableError};

/// Main configuration for a sablekv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory for all data files (WAL and SSTables)
    pub data_dir: PathBuf,

    /// Max number of memtable entries before a flush is triggered
    pub memtable_size: usize,

    /// Max number of live SSTables before compaction is triggered
    pub compaction_threshold: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./sablekv_data"),
            memtable_size: 4096,
            compaction_threshold: 10,
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate configuration values
    ///
    /// Both thresholds must be positive: a zero memtable size would flush on
    /// every write, a zero compaction threshold would compact on every flush.
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size == 0 {
            return Err(SableError::Config(
                "memtable_size must be a positive integer".to_string(),
            ));
        }
        if self.compaction_threshold == 0 {
            return Err(SableError::Config(
                "compaction_threshold must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.config.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the memtable entry-count flush threshold
    pub fn memtable_size(mut self, entries: usize) -> Self {
        self.config.memtable_size = entries;
        self
    }

    /// Set the SSTable-count compaction threshold
    pub fn compaction_threshold(mut self, tables: usize) -> Self {
        self.config.compaction_threshold = tables;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set the connection read timeout in milliseconds (0 disables)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the connection write timeout in milliseconds (0 disables)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
