//! Command definitions
//!
//! Requests from clients, tagged by their `command` field.

use serde::{Deserialize, Serialize};

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Put a key-value pair
    Put { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Delete a key
    Delete { key: String },

    /// Put many pairs with a single durability point
    BatchPut {
        keys: Vec<String>,
        values: Vec<String>,
    },

    /// All pairs with start_key <= key <= end_key, ascending
    GetRange {
        start_key: String,
        end_key: String,
    },

    /// Health check
    Ping,
}
