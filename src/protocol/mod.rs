//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format: newline-delimited JSON
//!
//! One request object per line, one response object per line.
//!
//! ### Requests
//! ```text
//! {"command":"put","key":"k","value":"v"}
//! {"command":"get","key":"k"}
//! {"command":"delete","key":"k"}
//! {"command":"batch_put","keys":["a","b"],"values":["1","2"]}
//! {"command":"get_range","start_key":"a","end_key":"z"}
//! {"command":"ping"}
//! ```
//!
//! ### Responses
//! ```text
//! {"status":"ok"}
//! {"status":"ok","value":"v"}
//! {"status":"ok","pairs":[["a","1"],["b","2"]]}
//! {"status":"error","message":"..."}
//! ```
//!
//! A successful `get` on an absent key answers `{"status":"ok"}` with no
//! `value` field. A line that does not parse as a request is answered with
//! an error response; the engine is never called for it.

mod codec;
mod command;
mod response;

pub use codec::{read_command, read_response, write_command, write_response};
pub use command::Command;
pub use response::{Response, Status};
