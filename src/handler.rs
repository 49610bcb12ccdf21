//! Command Handler
//!
//! Maps a parsed command onto keyspace operations and produces the reply frame.
//!
//! ## Responsibilities
//! - Dispatch by normalized command name
//! - Validate argument counts
//! - Encode every failure as an error frame (execution itself never fails)

use std::sync::Arc;

use bytes::Bytes;

use crate::protocol::{Command, CommandKind, Frame};
use crate::store::KeyValueStore;

/// Command execution capability used by the session loop
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &Command) -> Frame;
}

/// Executes commands against a shared keyspace
pub struct CommandHandler {
    store: Arc<dyn KeyValueStore>,
}

impl CommandHandler {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `PING [message]`
    fn ping(&self, args: &[Bytes]) -> Frame {
        match args {
            [] => Frame::pong(),
            [message] => Frame::bulk(message.clone()),
            _ => wrong_arity(CommandKind::Ping),
        }
    }

    /// `SET key value`
    fn set(&self, args: &[Bytes]) -> Frame {
        match args {
            [key, value] => {
                self.store.set(key.clone(), value.clone());
                Frame::ok()
            }
            _ => wrong_arity(CommandKind::Set),
        }
    }

    /// `GET key`
    fn get(&self, args: &[Bytes]) -> Frame {
        match args {
            [key] => match self.store.get(key) {
                Some(value) => Frame::bulk(value),
                None => Frame::null_bulk(),
            },
            _ => wrong_arity(CommandKind::Get),
        }
    }

    /// `EXISTS key [key ...]`
    ///
    /// Counts per position, so a repeated key that exists counts every time.
    fn exists(&self, args: &[Bytes]) -> Frame {
        if args.is_empty() {
            return wrong_arity(CommandKind::Exists);
        }
        let count = args.iter().filter(|key| self.store.exists(key)).count();
        Frame::Integer(count as i64)
    }

    /// `DEL key [key ...]`
    fn del(&self, args: &[Bytes]) -> Frame {
        let removed = match args {
            [] => return wrong_arity(CommandKind::Del),
            [key] => usize::from(self.store.delete(key)),
            keys => self.store.delete_many(keys),
        };
        Frame::Integer(removed as i64)
    }
}

impl CommandExecutor for CommandHandler {
    fn execute(&self, command: &Command) -> Frame {
        let args = command.args.as_slice();

        match command.kind() {
            Some(CommandKind::Ping) => self.ping(args),
            Some(CommandKind::Set) => self.set(args),
            Some(CommandKind::Get) => self.get(args),
            Some(CommandKind::Exists) => self.exists(args),
            Some(CommandKind::Del) => self.del(args),
            None => Frame::error(format!("ERR unknown command '{}'", command.name)),
        }
    }
}

fn wrong_arity(kind: CommandKind) -> Frame {
    Frame::error(format!(
        "ERR wrong number of arguments for '{}' command",
        kind.name()
    ))
}
