//! Client Connection
//!
//! One tracked connection: identifier, buffered reader/writer over the
//! transport, and the last-activity timestamp used by the idle reaper.

use std::fmt;
use std::io::{BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;

use crate::error::Result;
use crate::protocol::{Codec, Frame};
use super::Transport;

/// How long `close` waits for an in-flight write before skipping the flush
const FLUSH_LOCK_WAIT: Duration = Duration::from_millis(100);

/// Unique connection identifier (`conn_` + 16 hex digits of CSPRNG output)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        let raw: [u8; 8] = rand::thread_rng().gen();
        Self(format!("conn_{:016x}", u64::from_be_bytes(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client connection tracked by the connection manager
///
/// The reader is only touched by the session thread. The writer is shared
/// between the session thread and `close`. `control` is a third handle to the
/// same stream so the manager can shut it down while the session is blocked
/// in a read.
pub struct ClientConnection<T: Transport> {
    id: ConnectionId,
    peer_addr: String,
    reader: Mutex<BufReader<T>>,
    writer: Mutex<BufWriter<T>>,
    control: T,
    last_active: Mutex<Instant>,
    closed: AtomicBool,
}

impl<T: Transport> ClientConnection<T> {
    /// Wrap a transport with buffering and stamp it as active now
    pub(crate) fn new(id: ConnectionId, stream: T) -> Result<Self> {
        let peer_addr = stream.peer_label();
        let read_stream = stream.try_clone()?;
        let write_stream = stream.try_clone()?;

        Ok(Self {
            id,
            peer_addr,
            reader: Mutex::new(BufReader::new(read_stream)),
            writer: Mutex::new(BufWriter::new(write_stream)),
            control: stream,
            last_active: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Replace the id of a connection that is not yet shared
    pub(crate) fn reassign_id(&mut self, id: ConnectionId) {
        self.id = id;
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    /// Refresh the activity timestamp
    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    /// Time since the last successful read or write
    pub fn idle_for(&self) -> Duration {
        self.last_active().elapsed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Configure socket timeouts (`None` disables)
    ///
    /// Timeouts apply to each individual read or write call, so every
    /// successful I/O operation starts a fresh deadline.
    pub fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.control.set_read_timeout(read)?;
        self.control.set_write_timeout(write)?;
        Ok(())
    }

    /// Read and parse one frame
    pub fn read_frame(&self, codec: &dyn Codec) -> Result<Frame> {
        let mut reader = self.reader.lock();
        let frame = codec.parse(&mut *reader)?;
        self.touch();
        Ok(frame)
    }

    /// Write bytes and flush them
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(data)?;
        writer.flush()?;
        drop(writer);
        self.touch();
        Ok(())
    }

    /// Flush pending output and shut the transport down
    ///
    /// Idempotent. A session blocked reading from this connection sees end
    /// of stream and exits.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut writer) = self.writer.try_lock_for(FLUSH_LOCK_WAIT) {
            if let Err(e) = writer.flush() {
                tracing::trace!("Flush on close failed for {}: {}", self.id, e);
            }
        }
        if let Err(e) = self.control.shutdown() {
            tracing::trace!("Shutdown failed for {}: {}", self.id, e);
        }
    }
}

impl<T: Transport> fmt::Debug for ClientConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
