//! Server
//!
//! Binds the control and data planes on one port and runs both.
//!
//! ```text
//!               ┌──────────────────────────┐
//!   UDP ──────▶ │ control thread (1 loop)  │──┐
//!               └──────────────────────────┘  │
//!               ┌──────────────────────────┐  ├──▶ Engine ──▶ EntityStore
//!   TCP ──────▶ │ acceptor ─▶ thread/conn  │──┘
//!               └──────────────────────────┘
//! ```

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{BoardError, Result};

use super::control::serve_control;
use super::Connection;

/// How often blocked loops look at the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Signals a running server to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Message board server (UDP control plane + TCP data plane)
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    socket: UdpSocket,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind both planes on `config.listen_addr`
    ///
    /// TCP is bound first so that port 0 resolves to a concrete port the
    /// UDP socket can then share.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            BoardError::Transport(format!("cannot bind TCP {}: {}", config.listen_addr, e))
        })?;
        let addr = listener.local_addr()?;
        let socket = UdpSocket::bind(addr)
            .map_err(|e| BoardError::Transport(format!("cannot bind UDP {}: {}", addr, e)))?;

        listener.set_nonblocking(true)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;

        Ok(Self {
            config,
            engine,
            listener,
            socket,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address both planes are bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping `run` from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Run both planes until shutdown (blocking)
    pub fn run(self) -> Result<()> {
        tracing::info!("Listening on {} (UDP + TCP)", self.local_addr()?);

        // Step 1: Control plane on its own thread
        let control = {
            let socket = self.socket.try_clone()?;
            let engine = Arc::clone(&self.engine);
            let shutdown = Arc::clone(&self.shutdown);
            thread::Builder::new()
                .name("control-plane".to_string())
                .spawn(move || serve_control(&socket, &engine, &shutdown))?
        };

        // Step 2: Data plane in this thread; slots bound concurrent connections
        let (slots, released) = channel::bounded::<()>(self.config.max_connections.max(1));
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.dispatch(stream, &slots, &released) {
                        tracing::warn!("Failed to start connection for {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }

        // Step 3: Wait for the control plane to notice
        match control.join() {
            Ok(result) => result?,
            Err(_) => {
                return Err(BoardError::Transport("control-plane thread panicked".to_string()))
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Hand an accepted stream to its own thread
    fn dispatch(&self, stream: TcpStream, slots: &Sender<()>, released: &Receiver<()>) -> Result<()> {
        match slots.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                tracing::warn!(
                    "Connection limit ({}) reached, refusing {:?}",
                    self.config.max_connections,
                    stream.peer_addr().ok()
                );
                return Ok(());
            }
            Err(TrySendError::Disconnected(())) => {
                return Err(BoardError::Transport("connection slots closed".to_string()));
            }
        }
        let slot = SlotGuard::new(released.clone());

        // Accepted sockets inherit non-blocking mode on some platforms
        stream.set_nonblocking(false)?;

        let engine = Arc::clone(&self.engine);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        thread::Builder::new()
            .name("data-plane".to_string())
            .spawn(move || {
                let _slot = slot;
                let result = Connection::new(stream, engine).and_then(|mut connection| {
                    connection.set_timeouts(read_ms, write_ms)?;
                    connection.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection ended with error: {}", e);
                }
            })?;
        Ok(())
    }
}

/// Holds one connection slot; gives it back when dropped, even on panic
struct SlotGuard {
    released: Receiver<()>,
}

impl SlotGuard {
    fn new(released: Receiver<()>) -> Self {
        Self { released }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = self.released.try_recv();
    }
}
