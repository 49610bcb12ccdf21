//! Store Module
//!
//! The keyspace: a concurrency-safe mapping from binary-safe keys to
//! binary-safe values.
//!
//! ## Responsibilities
//! - Point operations only (set / get / exists / delete / delete_many)
//! - Every operation is atomic with respect to every other
//! - No knowledge of the wire format
//!
//! ## Data Structure Choice
//! Using HashMap wrapped in RwLock:
//! - No ordering needed across keys
//! - Reads (GET / EXISTS) share the lock, writes take it exclusively

mod memory;

use bytes::Bytes;

pub use memory::MemoryStore;

/// Keyspace capability used by the command handler
///
/// Absence is distinct from an empty value: `get` returns `None` for a key
/// that was never set (or was deleted), and `Some(Bytes::new())` for a key
/// set to the empty string.
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite a key
    fn set(&self, key: Bytes, value: Bytes);

    /// Look up a key
    fn get(&self, key: &[u8]) -> Option<Bytes>;

    /// Whether a key is present
    fn exists(&self, key: &[u8]) -> bool;

    /// Remove a key, returning whether it was present
    fn delete(&self, key: &[u8]) -> bool;

    /// Remove every listed key, returning how many removals happened
    ///
    /// A key listed twice is removed (and counted) at most once.
    fn delete_many(&self, keys: &[Bytes]) -> usize;
}
