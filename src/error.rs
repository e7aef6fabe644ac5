//! Error types for sablekv
//!
//! Provides a unified error type for all operations.
//!
//! Absence of a key is never an error: `get` returns `Ok(None)` for missing
//! or tombstoned keys.

use thiserror::Error;

/// Result type alias using SableError
pub type Result<T> = std::result::Result<T, SableError>;

/// Unified error type for sablekv operations
#[derive(Debug, Error)]
pub enum SableError {
    // -------------------------------------------------------------------------
    // I/O Errors (durability failures surface here)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Argument Errors (reported before any disk I/O)
    // -------------------------------------------------------------------------
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}
