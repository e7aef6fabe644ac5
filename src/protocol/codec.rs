//! Protocol codec
//!
//! Line-based reading and writing of commands and responses. Both sides of
//! the connection use the same four functions; the server reads commands and
//! writes responses, the client does the opposite.

use std::io::{BufRead, Write};

use crate::error::{Result, SableError};

use super::{Command, Response};

/// Read one newline-delimited command.
///
/// Returns `Ok(None)` on clean EOF (client disconnected between requests).
/// A line that is empty or fails to parse is a protocol error; the caller
/// answers it without involving the engine.
pub fn read_command(reader: &mut impl BufRead) -> Result<Option<Command>> {
    match read_line(reader)? {
        Some(line) => {
            let command = serde_json::from_str(&line)
                .map_err(|e| SableError::Protocol(format!("malformed request: {}", e)))?;
            Ok(Some(command))
        }
        None => Ok(None),
    }
}

/// Read one newline-delimited response. `Ok(None)` on clean EOF.
pub fn read_response(reader: &mut impl BufRead) -> Result<Option<Response>> {
    match read_line(reader)? {
        Some(line) => {
            let response = serde_json::from_str(&line)
                .map_err(|e| SableError::Protocol(format!("malformed response: {}", e)))?;
            Ok(Some(response))
        }
        None => Ok(None),
    }
}

/// Write one command as a JSON line and flush
pub fn write_command(writer: &mut impl Write, command: &Command) -> Result<()> {
    write_json_line(writer, command)
}

/// Write one response as a JSON line and flush
pub fn write_response(writer: &mut impl Write, response: &Response) -> Result<()> {
    write_json_line(writer, response)
}

fn read_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(SableError::Protocol("empty request line".to_string()));
    }

    Ok(Some(trimmed.to_string()))
}

fn write_json_line(writer: &mut impl Write, body: &impl serde::Serialize) -> Result<()> {
    let line = serde_json::to_string(body)
        .map_err(|e| SableError::Protocol(format!("encoding failed: {}", e)))?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
