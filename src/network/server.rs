//! TCP Server
//!
//! Accepts connections and runs one session thread per client.
//!
//! ## Threads
//! - `respkv-accept`: polls the (non-blocking) listener
//! - `respkv-reaper`: closes idle connections (only when an idle timeout is set)
//! - `respkv-conn`: one per accepted connection
//!
//! Every thread holds a clone of a crossbeam sender; shutdown knows all of
//! them have exited once the matching receiver reports disconnection.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::handler::{CommandExecutor, CommandHandler};
use crate::protocol::{Codec, Resp2Codec};
use crate::store::MemoryStore;
use super::{ConnectionManager, Session, Supervisor};

/// How long the accept loop waits between polls of an idle listener
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection worker exited in time
    Graceful,

    /// The shutdown timeout elapsed with workers still running
    TimedOut,
}

/// State shared by the accept loop, the reaper and every session
struct Shared {
    codec: Arc<dyn Codec>,
    executor: Arc<dyn CommandExecutor>,
    supervisor: Arc<dyn Supervisor<TcpStream>>,
    shutdown: Arc<AtomicBool>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

/// TCP server for respkv
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    codec: Arc<dyn Codec>,
    executor: Arc<dyn CommandExecutor>,
    supervisor: Arc<dyn Supervisor<TcpStream>>,
}

impl Server {
    /// Bind a server with the default components: RESP2 codec, in-memory
    /// store, and a connection manager sized from the config
    pub fn bind(config: Config) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let executor = Arc::new(CommandHandler::new(store));
        let supervisor = Arc::new(ConnectionManager::<TcpStream>::new(config.max_connections));
        Self::with_components(config, Arc::new(Resp2Codec), executor, supervisor)
    }

    /// Bind a server around caller-supplied components
    pub fn with_components(
        config: Config,
        codec: Arc<dyn Codec>,
        executor: Arc<dyn CommandExecutor>,
        supervisor: Arc<dyn Supervisor<TcpStream>>,
    ) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr.as_str()).map_err(|e| {
            KvError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            listener,
            local_addr,
            codec,
            executor,
            supervisor,
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept loop (and the idle reaper, if configured)
    pub fn start(self) -> Result<ServerHandle> {
        let shared = Arc::new(Shared {
            codec: self.codec,
            executor: self.executor,
            supervisor: self.supervisor,
            shutdown: Arc::new(AtomicBool::new(false)),
            read_timeout: self.config.read_timeout(),
            write_timeout: self.config.write_timeout(),
        });

        let (workers_tx, workers_rx) = channel::bounded::<()>(0);
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let (done_tx, done_rx) = channel::bounded::<()>(0);

        let acceptor = {
            let shared = Arc::clone(&shared);
            let workers = workers_tx.clone();
            let stop = stop_rx.clone();
            let listener = self.listener;
            thread::Builder::new()
                .name("respkv-accept".to_string())
                .spawn(move || accept_loop(listener, shared, workers, stop))?
        };

        if let Some(idle_timeout) = self.config.idle_timeout() {
            let supervisor = Arc::clone(&shared.supervisor);
            let workers = workers_tx.clone();
            let interval = self.config.reap_interval();
            thread::Builder::new()
                .name("respkv-reaper".to_string())
                .spawn(move || reap_loop(supervisor, idle_timeout, interval, workers, stop_rx))?;
        }

        tracing::info!("Listening on {}", self.local_addr);

        Ok(ServerHandle {
            local_addr: self.local_addr,
            shared,
            shutdown_timeout: self.config.shutdown_timeout(),
            acceptor: Mutex::new(Some(acceptor)),
            workers_tx: Mutex::new(Some(workers_tx)),
            workers_rx,
            stop_tx: Mutex::new(Some(stop_tx)),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            outcome: Mutex::new(None),
        })
    }
}

/// Handle to a running server
///
/// Dropping the handle shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown_timeout: Duration,
    acceptor: Mutex<Option<JoinHandle<()>>>,
    workers_tx: Mutex<Option<Sender<()>>>,
    workers_rx: Receiver<()>,
    stop_tx: Mutex<Option<Sender<()>>>,
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    outcome: Mutex<Option<ShutdownOutcome>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently tracked
    pub fn active_connections(&self) -> usize {
        self.shared.supervisor.active_count()
    }

    /// Signal the server to shut down and wait for it (bounded)
    ///
    /// 1. Stop accepting
    /// 2. Close every tracked connection
    /// 3. Wait for connection workers, up to the shutdown timeout
    ///
    /// Safe to call more than once; later calls return the first outcome.
    pub fn shutdown(&self) -> ShutdownOutcome {
        let mut outcome = self.outcome.lock();
        if let Some(outcome) = *outcome {
            return outcome;
        }

        tracing::info!("Shutting down server on {}", self.local_addr);
        self.shared.shutdown.store(true, Ordering::Release);
        drop(self.stop_tx.lock().take());

        if let Some(acceptor) = self.acceptor.lock().take() {
            if acceptor.join().is_err() {
                tracing::error!("Accept loop panicked");
            }
        }

        let closed = self.shared.supervisor.close_all();
        tracing::info!("Closed {} client connection(s)", closed);

        drop(self.workers_tx.lock().take());
        let deadline = Instant::now() + self.shutdown_timeout;
        let result = loop {
            match self.workers_rx.recv_deadline(deadline) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("All connections closed gracefully");
                    break ShutdownOutcome::Graceful;
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!("Timeout waiting for connections to close, forcing shutdown");
                    break ShutdownOutcome::TimedOut;
                }
            }
        };

        *outcome = Some(result);
        drop(self.done_tx.lock().take());
        result
    }

    /// Block until a shutdown (started from any thread) has completed
    pub fn wait(&self) {
        // Nothing is ever sent; this returns once the sender is dropped
        let _ = self.done_rx.recv();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Worker loops
// =============================================================================

fn accept_loop(listener: TcpListener, shared: Arc<Shared>, workers: Sender<()>, stop: Receiver<()>) {
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        match listener.accept() {
            Ok((stream, addr)) => {
                tracing::debug!("Accepted connection from {}", addr);
                if let Err(e) = spawn_session(stream, &shared, &workers) {
                    match e {
                        KvError::ConnectionLimit(max) => {
                            tracing::debug!("Rejecting {}: connection limit of {} reached", addr, max);
                        }
                        e => tracing::warn!("Failed to start session for {}: {}", addr, e),
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if let Err(RecvTimeoutError::Disconnected) = stop.recv_timeout(ACCEPT_POLL_INTERVAL) {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Error accepting connection: {}", e);
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }

    tracing::debug!("Accept loop stopped");
}

/// Register an accepted stream and run its session on a new thread
///
/// Over the connection limit the stream is dropped (closed) right here,
/// before any session exists.
fn spawn_session(stream: TcpStream, shared: &Arc<Shared>, workers: &Sender<()>) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;
    // Disable Nagle's algorithm for low latency
    stream.set_nodelay(true)?;

    let connection = shared.supervisor.register(stream)?;
    let id = connection.id().clone();

    if let Err(e) = connection.set_timeouts(shared.read_timeout, shared.write_timeout) {
        shared.supervisor.unregister(&id);
        return Err(e);
    }

    let session = Session::new(
        connection,
        Arc::clone(&shared.codec),
        Arc::clone(&shared.executor),
        Arc::clone(&shared.shutdown),
    );
    let supervisor = Arc::clone(&shared.supervisor);
    let worker = workers.clone();
    let thread_id = id.clone();

    let spawned = thread::Builder::new()
        .name("respkv-conn".to_string())
        .spawn(move || {
            let _worker = worker;
            if let Err(e) = session.run() {
                tracing::warn!("Session {} ended with error: {}", thread_id, e);
            }
            supervisor.unregister(&thread_id);
        });

    if let Err(e) = spawned {
        shared.supervisor.unregister(&id);
        return Err(e.into());
    }
    Ok(())
}

fn reap_loop(
    supervisor: Arc<dyn Supervisor<TcpStream>>,
    idle_timeout: Duration,
    interval: Duration,
    workers: Sender<()>,
    stop: Receiver<()>,
) {
    let _worker = workers;
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let reaped = supervisor.reap_idle(idle_timeout);
                if reaped > 0 {
                    tracing::info!("Reaped {} idle connection(s)", reaped);
                }
            }
            Ok(()) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("Idle reaper stopped");
}
