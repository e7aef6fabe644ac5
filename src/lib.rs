//! # sablekv
//!
//! An embeddable, network-exposed persistent key-value store with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with torn-write handling
//! - Immutable sorted tables (SSTables) with full compaction
//! - Point, batch, and range operations
//! - TCP-based client protocol (newline-delimited JSON)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                  (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                 │
//! │                  (Single Mutex)                             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          │            │            │
//!          ▼            ▼            ▼
//!   ┌─────────────┐ ┌──────────┐ ┌─────────────┐
//!   │     WAL     │ │ MemTable │ │   Storage   │
//!   │  (Append)   │ │ (BTree)  │ │ (SSTables)  │
//!   └─────────────┘ └──────────┘ └─────────────┘
//! ```
//!
//! Writes go WAL-then-memtable and are acknowledged after an fsync. A full
//! memtable is flushed into an immutable SSTable; a full SSTable set is
//! compacted into a single table. Reads consult the memtable first, then
//! SSTables newest to oldest.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod memtable;
pub mod network;
pub mod protocol;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, SableError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sablekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
