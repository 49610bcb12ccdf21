//! Protocol Module
//!
//! Defines the RESP2 wire protocol for client-server communication.
//!
//! ## Frame Types
//! - `+` Simple string
//! - `-` Error
//! - `:` Integer (signed 64-bit)
//! - `$` Bulk string (binary safe, `$-1` = null)
//! - `*` Array (`*-1` = null)
//!
//! ## Commands
//! Clients send an array of bulk strings; the first is the command name
//! (case-insensitive): PING, SET, GET, EXISTS, DEL.

mod command;
mod frame;
mod codec;

use std::io::BufRead;

use bytes::Bytes;

use crate::error::Result;

pub use command::{Command, CommandKind};
pub use frame::Frame;
pub use codec::{
    parse, serialize, serialize_into, to_command, encode_command,
    read_frame, write_frame,
    MAX_BULK_LENGTH, MAX_LINE_LENGTH, MAX_NESTING_DEPTH,
};

/// Wire codec capability used by the session loop
pub trait Codec: Send + Sync {
    /// Read exactly one frame
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Frame>;

    /// Encode a frame
    fn serialize(&self, frame: &Frame) -> Bytes;

    /// Interpret a frame as a command
    fn to_command(&self, frame: Frame) -> Result<Command>;
}

/// The RESP2 codec
#[derive(Debug, Default, Clone, Copy)]
pub struct Resp2Codec;

impl Codec for Resp2Codec {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Frame> {
        codec::parse(reader)
    }

    fn serialize(&self, frame: &Frame) -> Bytes {
        codec::serialize(frame)
    }

    fn to_command(&self, frame: Frame) -> Result<Command> {
        codec::to_command(frame)
    }
}
