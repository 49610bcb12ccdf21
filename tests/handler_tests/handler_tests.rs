//! Command Handler Tests
//!
//! Runs commands against a recording fake store, so every test can also check
//! which store calls happened.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use respkv::protocol::{Command, Frame};
use respkv::{CommandExecutor, CommandHandler, KeyValueStore, MemoryStore};

/// Store fake that records mutating calls
#[derive(Default)]
struct RecordingStore {
    data: Mutex<HashMap<Bytes, Bytes>>,
    writes: Mutex<Vec<String>>,
}

impl RecordingStore {
    fn with(entries: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        for (k, v) in entries {
            store.data.lock().insert(b(k), b(v));
        }
        Arc::new(store)
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

impl KeyValueStore for RecordingStore {
    fn set(&self, key: Bytes, value: Bytes) {
        self.writes.lock().push(format!("set {:?}", key));
        self.data.lock().insert(key, value);
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.lock().get(key).cloned()
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.data.lock().contains_key(key)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.writes.lock().push(format!("delete {:?}", Bytes::copy_from_slice(key)));
        self.data.lock().remove(key).is_some()
    }

    fn delete_many(&self, keys: &[Bytes]) -> usize {
        self.writes.lock().push(format!("delete_many {}", keys.len()));
        let mut data = self.data.lock();
        keys.iter().filter(|k| data.remove(&k[..]).is_some()).count()
    }
}

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn cmd(name: &str, args: &[&str]) -> Command {
    Command::new(name, args.iter().map(|a| b(a)).collect())
}

fn handler_over(store: &Arc<RecordingStore>) -> CommandHandler {
    CommandHandler::new(Arc::clone(store) as Arc<dyn KeyValueStore>)
}

// =============================================================================
// PING
// =============================================================================

#[test]
fn test_ping_without_args() {
    let handler = handler_over(&RecordingStore::with(&[]));
    assert_eq!(handler.execute(&cmd("PING", &[])), Frame::simple("PONG"));
}

#[test]
fn test_ping_echoes_argument() {
    let handler = handler_over(&RecordingStore::with(&[]));

    assert_eq!(handler.execute(&cmd("PING", &["hello"])), Frame::bulk("hello"));
    assert_eq!(handler.execute(&cmd("PING", &[""])), Frame::bulk(""));

    let binary = Command::new("PING", vec![Bytes::from_static(b"\x00\xff\r\n")]);
    assert_eq!(handler.execute(&binary), Frame::bulk(Bytes::from_static(b"\x00\xff\r\n")));
}

#[test]
fn test_ping_too_many_args() {
    let handler = handler_over(&RecordingStore::with(&[]));
    assert_eq!(
        handler.execute(&cmd("PING", &["a", "b"])),
        Frame::error("ERR wrong number of arguments for 'PING' command")
    );
}

// =============================================================================
// SET / GET
// =============================================================================

#[test]
fn test_set_then_get() {
    let store = RecordingStore::with(&[]);
    let handler = handler_over(&store);

    assert_eq!(handler.execute(&cmd("SET", &["k", "v"])), Frame::ok());
    assert_eq!(handler.execute(&cmd("GET", &["k"])), Frame::bulk("v"));
    assert_eq!(store.writes(), vec!["set b\"k\"".to_string()]);
}

#[test]
fn test_set_empty_value_is_not_null() {
    let handler = handler_over(&RecordingStore::with(&[]));

    handler.execute(&cmd("SET", &["k", ""]));
    assert_eq!(handler.execute(&cmd("GET", &["k"])), Frame::bulk(""));
}

#[test]
fn test_get_missing_is_null_bulk() {
    let handler = handler_over(&RecordingStore::with(&[]));
    assert_eq!(handler.execute(&cmd("GET", &["nope"])), Frame::null_bulk());
}

#[test]
fn test_wrong_arity_never_mutates() {
    let store = RecordingStore::with(&[("k", "v")]);
    let handler = handler_over(&store);

    let cases = [
        cmd("SET", &[]),
        cmd("SET", &["k"]),
        cmd("SET", &["k", "v", "extra"]),
        cmd("GET", &[]),
        cmd("GET", &["a", "b"]),
        cmd("EXISTS", &[]),
        cmd("DEL", &[]),
    ];

    for case in &cases {
        let reply = handler.execute(case);
        assert_eq!(
            reply,
            Frame::error(format!("ERR wrong number of arguments for '{}' command", case.name)),
            "{}",
            case
        );
    }

    assert!(store.writes().is_empty());
    assert_eq!(store.get(b"k"), Some(b("v")));
}

// =============================================================================
// EXISTS / DEL
// =============================================================================

#[test]
fn test_exists_counts_duplicates_per_occurrence() {
    let handler = handler_over(&RecordingStore::with(&[("a", "1")]));
    assert_eq!(handler.execute(&cmd("EXISTS", &["a", "b", "a"])), Frame::Integer(2));
}

#[test]
fn test_del_single_key_uses_delete() {
    let store = RecordingStore::with(&[("k", "v")]);
    let handler = handler_over(&store);

    assert_eq!(handler.execute(&cmd("DEL", &["k"])), Frame::Integer(1));
    assert_eq!(handler.execute(&cmd("DEL", &["k"])), Frame::Integer(0));
    assert_eq!(store.writes().len(), 2);
    assert!(store.writes()[0].starts_with("delete "));
}

#[test]
fn test_del_duplicates_counted_once() {
    let store = RecordingStore::with(&[("a", "1"), ("b", "2")]);
    let handler = handler_over(&store);

    assert_eq!(handler.execute(&cmd("DEL", &["a", "a", "b", "zz"])), Frame::Integer(2));
    assert_eq!(handler.execute(&cmd("EXISTS", &["a", "b"])), Frame::Integer(0));
    assert_eq!(store.writes(), vec!["delete_many 4".to_string()]);
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_command_names_are_case_insensitive() {
    let handler = handler_over(&RecordingStore::with(&[]));

    assert_eq!(handler.execute(&cmd("ping", &[])), Frame::pong());
    assert_eq!(handler.execute(&cmd("sEt", &["k", "v"])), Frame::ok());
    assert_eq!(handler.execute(&cmd("get", &["k"])), Frame::bulk("v"));
}

#[test]
fn test_unknown_command_names_itself() {
    let handler = handler_over(&RecordingStore::with(&[]));

    match handler.execute(&cmd("flushall", &[])) {
        Frame::Error(text) => {
            assert!(text.contains("FLUSHALL"), "{}", text);
            assert_eq!(text, "ERR unknown command 'FLUSHALL'");
        }
        other => panic!("Expected error, got {:?}", other),
    }
}

#[test]
fn test_example_scenario_against_memory_store() {
    let handler = CommandHandler::new(Arc::new(MemoryStore::new()));

    assert_eq!(handler.execute(&cmd("SET", &["k", "v"])), Frame::ok());
    assert_eq!(handler.execute(&cmd("GET", &["k"])), Frame::bulk("v"));
    assert_eq!(handler.execute(&cmd("EXISTS", &["k"])), Frame::Integer(1));
    assert_eq!(handler.execute(&cmd("DEL", &["k"])), Frame::Integer(1));
    assert_eq!(handler.execute(&cmd("GET", &["k"])), Frame::null_bulk());
}
