//! Connection Manager
//!
//! Tracks live client connections and their lifecycle.
//!
//! ## Responsibilities
//! - Enforce the maximum number of concurrent connections
//! - Hand out unique identifiers at accept time
//! - Close and forget connections (on session end, idle reaping, shutdown)

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{KvError, Result};
use super::{ClientConnection, ConnectionId, Transport};

/// Connection supervision capability used by the server
pub trait Supervisor<T: Transport>: Send + Sync {
    /// Start tracking a transport
    ///
    /// Fails with `KvError::ConnectionLimit` when the ceiling is reached; the
    /// transport is dropped (and so closed) in that case.
    fn register(&self, transport: T) -> Result<Arc<ClientConnection<T>>>;

    /// Close and forget a connection; unknown ids are ignored
    fn unregister(&self, id: &ConnectionId);

    fn lookup(&self, id: &ConnectionId) -> Option<Arc<ClientConnection<T>>>;

    fn active_count(&self) -> usize;

    /// Close every connection idle for longer than `threshold`
    ///
    /// Only the activity timestamp is consulted; the transport is never
    /// probed. Returns the number of connections reaped.
    fn reap_idle(&self, threshold: Duration) -> usize;

    /// Close every connection. Returns how many were closed.
    fn close_all(&self) -> usize;
}

/// Manages the connection table
///
/// ## Concurrency:
/// - `connections`: Protected by RwLock (lookups share, mutations exclusive)
/// - Transports are closed after the table lock is released
pub struct ConnectionManager<T: Transport = TcpStream> {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection<T>>>>,

    /// 0 = unlimited
    max_connections: usize,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            max_connections,
        }
    }

    fn at_capacity(&self, active: usize) -> bool {
        self.max_connections > 0 && active >= self.max_connections
    }
}

impl<T: Transport> Supervisor<T> for ConnectionManager<T> {
    fn register(&self, transport: T) -> Result<Arc<ClientConnection<T>>> {
        if self.at_capacity(self.connections.read().len()) {
            return Err(KvError::ConnectionLimit(self.max_connections));
        }

        // Clone the transport handles before taking the table lock
        let mut connection = ClientConnection::new(ConnectionId::generate(), transport)?;

        let mut connections = self.connections.write();
        if self.at_capacity(connections.len()) {
            return Err(KvError::ConnectionLimit(self.max_connections));
        }
        while connections.contains_key(connection.id()) {
            connection.reassign_id(ConnectionId::generate());
        }

        let connection = Arc::new(connection);
        connections.insert(connection.id().clone(), Arc::clone(&connection));
        let active = connections.len();
        drop(connections);

        tracing::debug!(
            "Registered {} from {} ({} active)",
            connection.id(),
            connection.peer_addr(),
            active
        );
        Ok(connection)
    }

    fn unregister(&self, id: &ConnectionId) {
        let removed = self.connections.write().remove(id);

        if let Some(connection) = removed {
            connection.close();
            tracing::debug!("Unregistered {}", id);
        }
    }

    fn lookup(&self, id: &ConnectionId) -> Option<Arc<ClientConnection<T>>> {
        self.connections.read().get(id).cloned()
    }

    fn active_count(&self) -> usize {
        self.connections.read().len()
    }

    fn reap_idle(&self, threshold: Duration) -> usize {
        let mut reaped = Vec::new();
        self.connections.write().retain(|_, connection| {
            if connection.idle_for() > threshold {
                reaped.push(Arc::clone(connection));
                false
            } else {
                true
            }
        });

        for connection in &reaped {
            tracing::debug!(
                "Reaping idle connection {} (idle {:?})",
                connection.id(),
                connection.idle_for()
            );
            connection.close();
        }
        reaped.len()
    }

    fn close_all(&self) -> usize {
        let drained: Vec<_> = self
            .connections
            .write()
            .drain()
            .map(|(_, connection)| connection)
            .collect();

        for connection in &drained {
            connection.close();
        }
        drained.len()
    }
}
