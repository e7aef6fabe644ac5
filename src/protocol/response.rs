//! Response definitions
//!
//! Responses to clients. Every response carries a `status`; the remaining
//! fields appear only when they carry something.

use serde::{Deserialize, Serialize};

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status of the request
    pub status: Status,

    /// Value for `get` (absent field = key absent) and `ping`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Ordered key-value pairs for `get_range`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<(String, String)>>,

    /// Human-readable error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// A bare OK (put/delete/batch_put acknowledgment, or an absent get)
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            value: None,
            pairs: None,
            message: None,
        }
    }

    /// OK carrying a value
    pub fn ok_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::ok()
        }
    }

    /// OK carrying range results
    pub fn ok_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            pairs: Some(pairs),
            ..Self::ok()
        }
    }

    /// An error with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            value: None,
            pairs: None,
            message: Some(message.into()),
        }
    }

    /// True if the status is `Ok`
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
