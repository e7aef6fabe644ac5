//! Connection Handler
//!
//! Handles a single client connection: read a command line, execute it
//! against the engine, write the response line.
//!
//! The engine is protocol-agnostic; the mapping from [`Command`] to typed
//! engine calls (and from engine results to [`Response`]) lives here.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{Result, SableError};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// Buffered stream reader
    reader: BufReader<TcpStream>,

    /// Buffered stream writer
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler with buffered I/O
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Responses are one line each; don't let Nagle hold them back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve the connection until the client disconnects.
    ///
    /// A malformed request line gets an error response and the loop
    /// continues; the engine is never called for it. Disconnects and
    /// timeouts end the loop without an error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(Some(command)) => command,
                Ok(None) => {
                    tracing::debug!("client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(SableError::Protocol(msg)) => {
                    tracing::debug!("rejected request from {}: {}", self.peer_addr, msg);
                    self.send_response(Response::error(msg))?;
                    continue;
                }
                Err(SableError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("client {} went away: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(SableError::Io(ref e)) if is_timeout(e.kind()) => {
                    tracing::debug!("read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("command from {}: {:?}", self.peer_addr, command);

            let response = self.execute(command);

            if let Err(e) = self.send_response(response) {
                if let SableError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "client {} disconnected before the response was sent",
                            self.peer_addr
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Route a command to the engine and build the response
    fn execute(&self, command: Command) -> Response {
        match command {
            Command::Put { key, value } => {
                match self.engine.put(key.as_bytes(), value.as_bytes()) {
                    Ok(()) => Response::ok(),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Command::Get { key } => match self.engine.get(key.as_bytes()) {
                Ok(Some(value)) => Response::ok_value(String::from_utf8_lossy(&value)),
                Ok(None) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Delete { key } => match self.engine.delete(key.as_bytes()) {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(e.to_string()),
            },
            Command::BatchPut { keys, values } => {
                let keys: Vec<Vec<u8>> = keys.into_iter().map(String::into_bytes).collect();
                let values: Vec<Vec<u8>> = values.into_iter().map(String::into_bytes).collect();
                match self.engine.batch_put(&keys, &values) {
                    Ok(()) => Response::ok(),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Command::GetRange { start_key, end_key } => {
                match self.engine.get_range(start_key.as_bytes(), end_key.as_bytes()) {
                    Ok(pairs) => Response::ok_pairs(
                        pairs
                            .into_iter()
                            .map(|(k, v)| {
                                (
                                    String::from_utf8_lossy(&k).into_owned(),
                                    String::from_utf8_lossy(&v).into_owned(),
                                )
                            })
                            .collect(),
                    ),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Command::Ping => Response::ok_value("PONG"),
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Error kinds that mean the client is gone rather than the server broke
fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
    )
}

/// Error kinds raised by a read timeout (platform-dependent)
fn is_timeout(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
