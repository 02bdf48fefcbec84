//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, TrySendError};
use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::{KvError, Result};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// How long an idle worker waits before re-checking the shutdown flag
const WORKER_POLL: Duration = Duration::from_millis(100);

/// Streams of connections currently being served, by connection id
type ActiveConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for BucketKV
pub struct Server {
    config: Arc<ServerConfig>,
    engine: Arc<Engine>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active: ActiveConnections,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: ServerConfig, engine: Arc<Engine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bind the listen address; returns the bound address
    ///
    /// Called by `run` if needed. Binding first lets callers learn the
    /// port when listening on port 0.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            KvError::Network(format!("cannot bind {}: {}", self.config.listen_addr, e))
        })?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Flag that stops `run` when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Start the server (blocking until shutdown)
    ///
    /// - Non-blocking accept loop polling the shutdown flag
    /// - Fixed pool of workers fed through a bounded channel
    /// - On shutdown, open connections are closed and workers joined
    pub fn run(&mut self) -> Result<()> {
        let addr = self.bind()?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| KvError::Network("listener not bound".to_string()))?;
        listener.set_nonblocking(true)?;

        let (tx, rx) = channel::bounded::<TcpStream>(self.config.max_pending_connections.max(1));
        let workers = self.spawn_workers(rx)?;

        tracing::info!(
            "Listening on {} with {} workers",
            addr,
            self.config.worker_threads
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    match tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!("Connection queue full, dropping {}", peer);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(KvError::Network("worker pool is gone".to_string()));
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        tracing::info!("Shutting down, closing {} connections", self.active.lock().len());
        drop(tx);
        for stream in self.active.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        for worker in workers {
            let _ = worker.join();
        }

        Ok(())
    }

    fn spawn_workers(&self, rx: Receiver<TcpStream>) -> Result<Vec<JoinHandle<()>>> {
        let next_id = Arc::new(AtomicU64::new(0));
        let mut workers = Vec::with_capacity(self.config.worker_threads.max(1));

        for i in 0..self.config.worker_threads.max(1) {
            let rx = rx.clone();
            let engine = Arc::clone(&self.engine);
            let config = Arc::clone(&self.config);
            let shutdown = Arc::clone(&self.shutdown);
            let active = Arc::clone(&self.active);
            let next_id = Arc::clone(&next_id);

            let handle = thread::Builder::new()
                .name(format!("bucketkv-worker-{}", i))
                .spawn(move || loop {
                    match rx.recv_timeout(WORKER_POLL) {
                        Ok(stream) => {
                            let id = next_id.fetch_add(1, Ordering::Relaxed);
                            serve(stream, id, &engine, &config, &active);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if shutdown.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                })?;
            workers.push(handle);
        }

        Ok(workers)
    }
}

/// Serve one connection to completion, tracking it for shutdown
fn serve(
    stream: TcpStream,
    id: u64,
    engine: &Arc<Engine>,
    config: &Arc<ServerConfig>,
    active: &ActiveConnections,
) {
    if let Ok(clone) = stream.try_clone() {
        active.lock().insert(id, clone);
    }

    match Connection::new(stream, Arc::clone(engine), Arc::clone(config)) {
        Ok(mut connection) => {
            if let Err(e) = connection.handle() {
                tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
            }
        }
        Err(e) => tracing::warn!("Failed to set up connection: {}", e),
    }

    active.lock().remove(&id);
}
