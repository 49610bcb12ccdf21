//! In-memory store implementation
//!
//! HashMap-based keyspace with RwLock for concurrency.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use super::KeyValueStore;

/// In-memory keyspace
///
/// ## Concurrency:
/// - `data`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - All methods use `&self`; share it behind an `Arc`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: Bytes, value: Bytes) {
        self.data.write().insert(key, value);
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.data.write().remove(key).is_some()
    }

    fn delete_many(&self, keys: &[Bytes]) -> usize {
        // One write guard for the whole batch; a repeated key finds nothing
        // the second time round.
        let mut data = self.data.write();
        keys.iter()
            .filter(|key| data.remove(&key[..]).is_some())
            .count()
    }
}
