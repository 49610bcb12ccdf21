//! Command definitions
//!
//! Represents commands from clients.

use std::fmt;

use bytes::Bytes;

/// Commands the server knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    Set,
    Get,
    Exists,
    Del,
}

impl CommandKind {
    /// Look up a command by its normalized (upper-case) name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PING" => Some(CommandKind::Ping),
            "SET" => Some(CommandKind::Set),
            "GET" => Some(CommandKind::Get),
            "EXISTS" => Some(CommandKind::Exists),
            "DEL" => Some(CommandKind::Del),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Ping => "PING",
            CommandKind::Set => "SET",
            CommandKind::Get => "GET",
            CommandKind::Exists => "EXISTS",
            CommandKind::Del => "DEL",
        }
    }
}

/// A parsed command: upper-cased name plus positional, binary-safe arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, normalized to upper case
    pub name: String,

    /// Arguments in the order the client sent them
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl AsRef<str>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.as_ref().to_ascii_uppercase(),
            args,
        }
    }

    /// The known command this name refers to, if any
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::from_name(&self.name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {:?}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
