//! # respkv
//!
//! A minimal in-memory key-value server with:
//! - The RESP2 wire protocol over TCP
//! - PING, SET, GET, EXISTS and DEL
//! - One thread per client, shared keyspace behind a RwLock
//! - Connection limit, idle reaping and bounded graceful shutdown
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              TCP Server (accept thread)                      │
//! │        Connection Manager (limit, ids, reaping)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Session Loop                              │
//! │           read → parse → execute → write                     │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!   ┌─────────────────┐            ┌─────────────────┐
//!   │  RESP2 Codec    │            │ Command Handler │
//!   │ (parse/encode)  │            └────────┬────────┘
//!   └─────────────────┘                     │
//!                                           ▼
//!                                  ┌─────────────────┐
//!                                  │  MemoryStore    │
//!                                  │   (RwLock)      │
//!                                  └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod store;
pub mod handler;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use handler::{CommandExecutor, CommandHandler};
pub use network::{Server, ServerHandle, ShutdownOutcome};
pub use store::{KeyValueStore, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
