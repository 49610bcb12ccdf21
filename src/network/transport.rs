//! Transport abstraction
//!
//! The connection manager and session loop only need a duplex byte stream
//! that can be cloned into separate read/write handles and shut down from a
//! third handle while another thread is blocked on it.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A cloneable, shut-downable byte stream
pub trait Transport: Read + Write + Send + Sync + Sized + 'static {
    /// Another handle to the same underlying stream
    fn try_clone(&self) -> std::io::Result<Self>;

    /// Close both directions; unblocks any thread reading from a clone
    fn shutdown(&self) -> std::io::Result<()>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Human-readable peer address for logging
    fn peer_label(&self) -> String;
}

impl Transport for TcpStream {
    fn try_clone(&self) -> std::io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn peer_label(&self) -> String {
        self.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
