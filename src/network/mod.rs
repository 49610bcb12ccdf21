//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One session thread per connection
//! - Connection manager tracks every live connection
//! - Commands routed through the command handler

mod transport;
mod connection;
mod manager;
mod session;
mod server;

pub use transport::Transport;
pub use connection::{ClientConnection, ConnectionId};
pub use manager::{ConnectionManager, Supervisor};
pub use session::Session;
pub use server::{Server, ServerHandle, ShutdownOutcome};
