//! Frame definitions
//!
//! A frame is one RESP2 protocol value, as read off or written to the wire.

use bytes::Bytes;

/// A RESP2 protocol value
///
/// Null bulk strings and null arrays are `None`, which keeps them distinct from
/// each other and from the empty (zero-length) forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string: `+OK\r\n`
    Simple(String),

    /// Error: `-ERR message\r\n`
    Error(String),

    /// Integer: `:1000\r\n`
    Integer(i64),

    /// Bulk string: `$5\r\nhello\r\n`, or `$-1\r\n` for null
    Bulk(Option<Bytes>),

    /// Array: `*2\r\n...`, or `*-1\r\n` for null
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Create a simple string frame
    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    /// Create an error frame
    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    /// Create a (non-null) bulk string frame
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// Create a (non-null) array frame
    pub fn array(items: Vec<Frame>) -> Self {
        Frame::Array(Some(items))
    }

    /// The null bulk string (`$-1\r\n`)
    pub fn null_bulk() -> Self {
        Frame::Bulk(None)
    }

    /// The null array (`*-1\r\n`)
    pub fn null_array() -> Self {
        Frame::Array(None)
    }

    /// `+OK\r\n`
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    /// `+PONG\r\n`
    pub fn pong() -> Self {
        Frame::Simple("PONG".to_string())
    }

    /// Error reply for a frame the codec could not read
    pub fn protocol_error(detail: impl std::fmt::Display) -> Self {
        Frame::Error(format!("ERR Protocol error: {}", detail))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None))
    }

    /// Short name of the variant, for error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Simple(_) => "simple string",
            Frame::Error(_) => "error",
            Frame::Integer(_) => "integer",
            Frame::Bulk(_) => "bulk string",
            Frame::Array(_) => "array",
        }
    }
}
