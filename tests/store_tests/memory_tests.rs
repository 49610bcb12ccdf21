//! MemoryStore Tests
//!
//! Tests verify:
//! - Set / get round trips (including empty and binary values)
//! - Absence vs. empty value
//! - Delete and delete_many counting
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use proptest::prelude::*;
use respkv::{KeyValueStore, MemoryStore};

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_set_and_get() {
    let store = MemoryStore::new();

    store.set(b("key1"), b("value1"));

    assert_eq!(store.get(b"key1"), Some(b("value1")));
}

#[test]
fn test_get_nonexistent_key() {
    let store = MemoryStore::new();

    assert_eq!(store.get(b"nonexistent"), None);
    assert!(!store.exists(b"nonexistent"));
}

#[test]
fn test_set_overwrites_existing() {
    let store = MemoryStore::new();

    store.set(b("key1"), b("value1"));
    store.set(b("key1"), b("value2"));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(b"key1"), Some(b("value2")));
}

#[test]
fn test_empty_key_and_value() {
    let store = MemoryStore::new();

    store.set(Bytes::new(), Bytes::new());

    assert!(store.exists(b""));
    assert_eq!(store.get(b""), Some(Bytes::new()));
}

#[test]
fn test_binary_values() {
    let store = MemoryStore::new();
    let key = Bytes::from_static(&[0x00, 0x0d, 0x0a, 0xff]);
    let value: Bytes = (0..=255u8).collect::<Vec<_>>().into();

    store.set(key.clone(), value.clone());

    assert_eq!(store.get(&key), Some(value));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_existing_and_missing() {
    let store = MemoryStore::new();
    store.set(b("k"), b("v"));

    assert!(store.delete(b"k"));
    assert!(!store.exists(b"k"));
    assert!(!store.delete(b"k"));
}

#[test]
fn test_delete_many_counts_removals() {
    let store = MemoryStore::new();
    store.set(b("a"), b("1"));
    store.set(b("b"), b("2"));
    store.set(b("c"), b("3"));

    let removed = store.delete_many(&[b("a"), b("c"), b("missing")]);

    assert_eq!(removed, 2);
    assert!(!store.exists(b"a"));
    assert!(store.exists(b"b"));
    assert!(!store.exists(b"c"));
}

#[test]
fn test_delete_many_duplicates_count_once() {
    let store = MemoryStore::new();
    store.set(b("a"), b("1"));
    store.set(b("b"), b("2"));

    let removed = store.delete_many(&[b("a"), b("a"), b("b"), b("a")]);

    assert_eq!(removed, 2);
    assert!(store.is_empty());
}

#[test]
fn test_delete_then_get_is_absent() {
    let store = MemoryStore::new();
    store.set(b("k"), b(""));
    store.delete(b"k");

    assert_eq!(store.get(b"k"), None);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_disjoint_keys() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = vec![];

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..500 {
                store.set(b(&format!("t{}-k{}", t, i)), b(&format!("v{}", i)));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 500);
    for t in 0..8 {
        for i in 0..500 {
            let key = format!("t{}-k{}", t, i);
            assert_eq!(store.get(key.as_bytes()), Some(b(&format!("v{}", i))));
        }
    }
}

#[test]
fn test_concurrent_delete_many_removes_each_key_once() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..1000 {
        store.set(b(&format!("k{}", i)), b("v"));
    }

    let keys: Arc<Vec<Bytes>> = Arc::new((0..1000).map(|i| b(&format!("k{}", i))).collect());
    let mut handles = vec![];

    for _ in 0..4 {
        let store = Arc::clone(&store);
        let keys = Arc::clone(&keys);
        handles.push(thread::spawn(move || store.delete_many(&keys)));
    }

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 1000);
    assert!(store.is_empty());
}

#[test]
fn test_readers_see_completed_writes() {
    let store = Arc::new(MemoryStore::new());
    store.set(b("shared"), b("initial"));

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..1000 {
                store.set(b("shared"), b(&format!("value-{}", i)));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let value = store.get(b"shared").unwrap();
                    assert!(value == b("initial") || value.starts_with(b"value-"));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.get(b"shared"), Some(b("value-999")));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_get_returns_last_set(
        key in proptest::collection::vec(any::<u8>(), 0..64),
        first in proptest::collection::vec(any::<u8>(), 0..128),
        second in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let store = MemoryStore::new();

        store.set(Bytes::from(key.clone()), Bytes::from(first.clone()));
        prop_assert_eq!(store.get(&key), Some(Bytes::from(first)));

        store.set(Bytes::from(key.clone()), Bytes::from(second.clone()));
        prop_assert_eq!(store.get(&key), Some(Bytes::from(second)));
        prop_assert_eq!(store.len(), 1);
    }

    #[test]
    fn prop_delete_many_matches_distinct_present_keys(
        present in proptest::collection::hash_set(proptest::collection::vec(any::<u8>(), 0..16), 0..16),
        requested in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 0..24),
    ) {
        let store = MemoryStore::new();
        for key in &present {
            store.set(Bytes::from(key.clone()), Bytes::from_static(b"v"));
        }

        let distinct_hits = requested
            .iter()
            .filter(|key| present.contains(*key))
            .collect::<std::collections::HashSet<_>>()
            .len();
        let keys: Vec<Bytes> = requested.iter().cloned().map(Bytes::from).collect();

        prop_assert_eq!(store.delete_many(&keys), distinct_hits);
        for key in &requested {
            prop_assert!(!store.exists(key));
        }
    }
}
