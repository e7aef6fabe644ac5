//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, SableError};

use super::Connection;

/// Message sent to worker threads
enum WorkerMessage {
    /// New client connection to handle
    NewConnection(TcpStream),
    /// Signal to shut down
    Shutdown,
}

/// TCP server for sablekv
///
/// ## Architecture
/// - Main thread accepts connections
/// - Worker thread pool handles client I/O
/// - One shared engine reference for all workers
pub struct Server {
    /// Server configuration
    config: Config,

    /// Shared storage engine
    engine: Arc<Engine>,

    /// TCP listener (created on run)
    listener: Option<TcpListener>,

    /// Channel to send work to workers
    work_sender: Option<Sender<WorkerMessage>>,

    /// Worker thread handles
    workers: Vec<JoinHandle<()>>,

    /// Shutdown flag
    shutdown: Arc<AtomicBool>,

    /// Active connection count
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            work_sender: None,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start the server (blocking).
    ///
    /// Binds the configured address, spawns the worker pool, and accepts
    /// connections until shutdown is signaled.
    pub fn run(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            SableError::Network(format!(
                "failed to bind {}: {}",
                self.config.listen_addr, e
            ))
        })?;

        // Nonblocking accept so the loop can poll the shutdown flag
        listener.set_nonblocking(true)?;

        tracing::info!("server listening on {}", self.config.listen_addr);
        self.listener = Some(listener);

        let worker_count = worker_count();
        let (sender, receiver) = bounded::<WorkerMessage>(self.config.max_connections);
        self.work_sender = Some(sender);

        tracing::info!("starting {} worker threads", worker_count);

        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                receiver: receiver.clone(),
                engine: Arc::clone(&self.engine),
                active_connections: Arc::clone(&self.active_connections),
                read_timeout_ms: self.config.read_timeout_ms,
                write_timeout_ms: self.config.write_timeout_ms,
            };
            let handle = thread::Builder::new()
                .name(format!("sablekv-worker-{}", worker_id))
                .spawn(move || worker.run())
                .map_err(|e| SableError::Network(format!("failed to spawn worker: {}", e)))?;

            self.workers.push(handle);
        }

        self.accept_loop()?;
        self.cleanup();

        Ok(())
    }

    /// Main accept loop; exits when the shutdown flag is set
    fn accept_loop(&mut self) -> Result<()> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            SableError::Network("accept loop started before bind".to_string())
        })?;
        let sender = self.work_sender.as_ref().ok_or_else(|| {
            SableError::Network("accept loop started without a worker pool".to_string())
        })?;

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    let current = self.active_connections.load(Ordering::Relaxed);
                    if current >= self.config.max_connections {
                        tracing::warn!(
                            "connection limit reached ({}/{}), rejecting {}",
                            current,
                            self.config.max_connections,
                            addr
                        );
                        drop(stream);
                        continue;
                    }

                    tracing::debug!("accepted connection from {}", addr);

                    if let Err(e) = sender.send(WorkerMessage::NewConnection(stream)) {
                        tracing::error!("failed to dispatch connection: {}", e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections; sleep briefly before re-polling
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        tracing::error!("accept error: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Stop workers and join them
    fn cleanup(&mut self) {
        tracing::info!("shutting down server");

        if let Some(sender) = &self.work_sender {
            for _ in 0..self.workers.len() {
                let _ = sender.send(WorkerMessage::Shutdown);
            }
        }

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                tracing::error!("worker thread panicked: {:?}", e);
            }
        }

        tracing::info!("server shutdown complete");
    }

    /// Signal the server to shut down gracefully
    pub fn shutdown(&self) {
        tracing::info!("shutdown signal received");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// True until shutdown has been signaled
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Number of currently active connections
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bound address (once running)
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }
}

/// Worker thread that handles client connections
struct Worker {
    /// Worker ID for logging
    id: usize,

    /// Channel to receive work
    receiver: Receiver<WorkerMessage>,

    /// Shared engine reference
    engine: Arc<Engine>,

    /// Active connection counter
    active_connections: Arc<AtomicUsize>,

    /// Read timeout in milliseconds
    read_timeout_ms: u64,

    /// Write timeout in milliseconds
    write_timeout_ms: u64,
}

impl Worker {
    fn run(self) {
        tracing::debug!("worker {} started", self.id);

        loop {
            match self.receiver.recv() {
                Ok(WorkerMessage::NewConnection(stream)) => {
                    self.handle_connection(stream);
                }
                Ok(WorkerMessage::Shutdown) => {
                    tracing::debug!("worker {} received shutdown signal", self.id);
                    break;
                }
                Err(_) => {
                    tracing::debug!("worker {} channel closed", self.id);
                    break;
                }
            }
        }

        tracing::debug!("worker {} stopped", self.id);
    }

    fn handle_connection(&self, stream: TcpStream) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let mut conn = match Connection::new(stream, Arc::clone(&self.engine)) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("failed to create connection: {}", e);
                self.active_connections.fetch_sub(1, Ordering::Relaxed);
                return;
            }
        };

        if let Err(e) = conn.set_timeouts(self.read_timeout_ms, self.write_timeout_ms) {
            tracing::warn!("failed to set connection timeouts: {}", e);
        }

        if let Err(e) = conn.handle() {
            tracing::debug!("connection {} ended with error: {}", conn.peer_addr(), e);
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Worker pool size (one thread per available core, minimum fallback of 4)
fn worker_count() -> usize {
    thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_server_creation() {
        let temp_dir = tempdir().unwrap();
        let config = Config::builder()
            .data_dir(temp_dir.path())
            .listen_addr("127.0.0.1:0")
            .build();

        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Server::new(config, engine);

        assert!(server.is_running());
        assert_eq!(server.active_connections(), 0);
    }
}
