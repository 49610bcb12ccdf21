//! Session Loop
//!
//! Runs one client connection: read a frame, turn it into a command, execute
//! it, write the reply, repeat.
//!
//! ## Error policy
//! - End of stream, reset, timeout: the session ends quietly
//! - Malformed frame or command: an error reply is sent and the loop continues
//! - Failed reply write: the session ends

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{KvError, Result};
use crate::handler::CommandExecutor;
use crate::protocol::{Codec, Frame};
use super::{ClientConnection, Transport};

/// Per-connection request/response loop
pub struct Session<T: Transport> {
    connection: Arc<ClientConnection<T>>,
    codec: Arc<dyn Codec>,
    executor: Arc<dyn CommandExecutor>,
    shutdown: Arc<AtomicBool>,
}

impl<T: Transport> Session<T> {
    pub fn new(
        connection: Arc<ClientConnection<T>>,
        codec: Arc<dyn Codec>,
        executor: Arc<dyn CommandExecutor>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            connection,
            codec,
            executor,
            shutdown,
        }
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok(())` when the client goes away or the connection is closed
    /// from outside, and `Err` only for unexpected transport failures.
    pub fn run(&self) -> Result<()> {
        let peer = self.connection.peer_addr();
        tracing::debug!("Session {} started for {}", self.connection.id(), peer);

        loop {
            if self.shutdown.load(Ordering::Acquire) || self.connection.is_closed() {
                tracing::debug!("Session {} closed by server", self.connection.id());
                return Ok(());
            }

            // Read next frame
            let frame = match self.connection.read_frame(self.codec.as_ref()) {
                Ok(frame) => frame,
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} disconnected ({})", peer, e);
                    return Ok(());
                }
                Err(e @ KvError::Protocol(_)) => {
                    tracing::debug!("Malformed input from {}: {}", peer, e);
                    if let Err(e) = self.reply(&Frame::protocol_error(detail(&e))) {
                        return write_failed(e);
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", peer, e);
                    return Err(e);
                }
            };

            let command = match self.codec.to_command(frame) {
                Ok(command) => command,
                Err(e) => {
                    tracing::debug!("Invalid command from {}: {}", peer, e);
                    if let Err(e) = self.reply(&Frame::protocol_error(detail(&e))) {
                        return write_failed(e);
                    }
                    continue;
                }
            };

            tracing::trace!("Received command from {}: {}", peer, command);

            let response = self.executor.execute(&command);
            if let Err(e) = self.reply(&response) {
                return write_failed(e);
            }
        }
    }

    /// Serialize and send a reply
    fn reply(&self, frame: &Frame) -> Result<()> {
        let bytes = self.codec.serialize(frame);
        self.connection.write(&bytes).map_err(|e| {
            if e.is_disconnect() {
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    self.connection.peer_addr(),
                    e
                );
            } else {
                tracing::warn!("Error writing to {}: {}", self.connection.peer_addr(), e);
            }
            e
        })
    }
}

/// A failed write always ends the session; a vanished peer is not an error
fn write_failed(e: KvError) -> Result<()> {
    if e.is_disconnect() {
        Ok(())
    } else {
        Err(e)
    }
}

/// Message text of a protocol/command error, without the enum's prefix
fn detail(e: &KvError) -> String {
    match e {
        KvError::Protocol(msg) | KvError::Command(msg) => msg.clone(),
        other => other.to_string(),
    }
}
