//! Protocol codec
//!
//! Parsing and serialization for the RESP2 wire format.
//!
//! ## Wire Format
//!
//! ```text
//! +<text>\r\n                      simple string
//! -<text>\r\n                      error
//! :<base-10 int>\r\n               integer
//! $<len>\r\n<len bytes>\r\n        bulk string   ($-1\r\n = null)
//! *<count>\r\n<count frames>       array         (*-1\r\n = null)
//! ```
//!
//! Requests are always a non-null array of bulk strings:
//! `*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n`

use std::io::{BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};
use super::{Command, Frame};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Largest accepted bulk string payload (512 MB)
pub const MAX_BULK_LENGTH: i64 = 512 * 1024 * 1024;

/// Longest accepted header or simple-string line, terminator included (64 KB)
pub const MAX_LINE_LENGTH: u64 = 64 * 1024;

/// Deepest accepted array nesting
pub const MAX_NESTING_DEPTH: usize = 64;

/// Cap on up-front allocation driven by a client-supplied length
const PREALLOC_LIMIT: usize = 4096;

/// What a frame that cannot be encoded faithfully turns into
const INVALID_FRAME: &[u8] = b"-ERR invalid protocol value\r\n";

// =============================================================================
// Parsing
// =============================================================================

/// Parse exactly one frame from a buffered reader
///
/// Blocks until the whole frame has arrived. A stream that ends (before or in
/// the middle of a frame) is reported as `KvError::Io` with kind
/// `UnexpectedEof`; malformed input is `KvError::Protocol`.
pub fn parse<R: BufRead + ?Sized>(reader: &mut R) -> Result<Frame> {
    parse_frame(reader, 0)
}

fn parse_frame<R: BufRead + ?Sized>(reader: &mut R, depth: usize) -> Result<Frame> {
    let mut marker = [0u8; 1];
    reader.read_exact(&mut marker)?;

    match marker[0] {
        b'+' => Ok(Frame::Simple(read_text_line(reader)?)),
        b'-' => Ok(Frame::Error(read_text_line(reader)?)),
        b':' => parse_integer(reader),
        b'$' => parse_bulk(reader),
        b'*' => parse_array(reader, depth),
        other => {
            skip_line(reader)?;
            Err(KvError::Protocol(format!(
                "invalid RESP2 type indicator: '{}'",
                (other as char).escape_default()
            )))
        }
    }
}

/// Drop the rest of the current line so the next parse starts on a fresh one
fn skip_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<()> {
    let mut discarded = Vec::new();
    Read::take(&mut *reader, MAX_LINE_LENGTH).read_until(b'\n', &mut discarded)?;
    Ok(())
}

fn parse_integer<R: BufRead + ?Sized>(reader: &mut R) -> Result<Frame> {
    let line = read_line(reader)?;
    let text = std::str::from_utf8(&line)
        .map_err(|_| KvError::Protocol("invalid integer format".to_string()))?;
    let value = text
        .parse::<i64>()
        .map_err(|_| KvError::Protocol(format!("invalid integer format: {}", text)))?;
    Ok(Frame::Integer(value))
}

fn parse_bulk<R: BufRead + ?Sized>(reader: &mut R) -> Result<Frame> {
    let len = read_length(reader, "bulk string")?;
    if len == -1 {
        return Ok(Frame::Bulk(None));
    }
    if len < -1 {
        return Err(KvError::Protocol(format!("invalid bulk string length: {}", len)));
    }
    if len > MAX_BULK_LENGTH {
        return Err(KvError::Protocol(format!(
            "bulk string length {} exceeds maximum of {}",
            len, MAX_BULK_LENGTH
        )));
    }

    let len = len as usize;
    let mut data = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    Read::take(&mut *reader, len as u64).read_to_end(&mut data)?;
    if data.len() < len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }

    let mut terminator = [0u8; 2];
    reader.read_exact(&mut terminator)?;
    if terminator != CRLF {
        return Err(KvError::Protocol(
            "bulk string payload not followed by \\r\\n".to_string(),
        ));
    }

    Ok(Frame::Bulk(Some(Bytes::from(data))))
}

fn parse_array<R: BufRead + ?Sized>(reader: &mut R, depth: usize) -> Result<Frame> {
    let count = read_length(reader, "array")?;
    if count == -1 {
        return Ok(Frame::Array(None));
    }
    if count < -1 {
        return Err(KvError::Protocol(format!("invalid array length: {}", count)));
    }
    if depth >= MAX_NESTING_DEPTH {
        return Err(KvError::Protocol(format!(
            "array nesting exceeds maximum depth of {}",
            MAX_NESTING_DEPTH
        )));
    }

    let count = count as usize;
    let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        items.push(parse_frame(reader, depth + 1)?);
    }

    Ok(Frame::Array(Some(items)))
}

/// Read a `<decimal>\r\n` header line
fn read_length<R: BufRead + ?Sized>(reader: &mut R, what: &str) -> Result<i64> {
    let line = read_line(reader)?;
    std::str::from_utf8(&line)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| {
            KvError::Protocol(format!(
                "invalid {} length: {}",
                what,
                String::from_utf8_lossy(&line)
            ))
        })
}

fn read_text_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<String> {
    let line = read_line(reader)?;
    String::from_utf8(line).map_err(|_| KvError::Protocol("line is not valid UTF-8".to_string()))
}

/// Read one `\r\n`-terminated line and return it without the terminator
fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let n = Read::take(&mut *reader, MAX_LINE_LENGTH).read_until(b'\n', &mut line)?;

    if line.last() != Some(&b'\n') {
        if n as u64 == MAX_LINE_LENGTH {
            return Err(KvError::Protocol(format!(
                "line exceeds maximum length of {} bytes",
                MAX_LINE_LENGTH
            )));
        }
        // Stream ended before the line did
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    if !line.ends_with(CRLF) {
        return Err(KvError::Protocol(
            "invalid line ending, expected \\r\\n".to_string(),
        ));
    }

    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

// =============================================================================
// Serialization
// =============================================================================

/// Serialize a frame to its canonical encoding
pub fn serialize(frame: &Frame) -> Bytes {
    let mut buf = BytesMut::new();
    serialize_into(frame, &mut buf);
    buf.freeze()
}

/// Serialize a frame into an existing buffer
///
/// Simple strings and errors whose text contains CR or LF would corrupt the
/// stream, so they are written as a generic error instead.
pub fn serialize_into(frame: &Frame, buf: &mut BytesMut) {
    match frame {
        Frame::Simple(text) => put_line(buf, b'+', text),
        Frame::Error(text) => put_line(buf, b'-', text),
        Frame::Integer(n) => {
            buf.put_u8(b':');
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(CRLF);
        }
        Frame::Bulk(None) => buf.put_slice(b"$-1\r\n"),
        Frame::Bulk(Some(data)) => {
            buf.put_u8(b'$');
            buf.put_slice(data.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(data);
            buf.put_slice(CRLF);
        }
        Frame::Array(None) => buf.put_slice(b"*-1\r\n"),
        Frame::Array(Some(items)) => {
            buf.put_u8(b'*');
            buf.put_slice(items.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            for item in items {
                serialize_into(item, buf);
            }
        }
    }
}

fn put_line(buf: &mut BytesMut, marker: u8, text: &str) {
    if text.bytes().any(|b| b == b'\r' || b == b'\n') {
        buf.put_slice(INVALID_FRAME);
        return;
    }
    buf.put_u8(marker);
    buf.put_slice(text.as_bytes());
    buf.put_slice(CRLF);
}

// =============================================================================
// Commands
// =============================================================================

/// Interpret a frame as a command
///
/// The frame must be a non-null, non-empty array whose elements are all
/// non-null bulk strings. The first element is the command name.
pub fn to_command(frame: Frame) -> Result<Command> {
    let items = match frame {
        Frame::Array(Some(items)) => items,
        Frame::Array(None) => {
            return Err(KvError::Command("command array cannot be empty".to_string()))
        }
        other => {
            return Err(KvError::Command(format!(
                "command must be an array, got {}",
                other.kind()
            )))
        }
    };

    let mut parts = items.into_iter().enumerate().map(|(i, item)| match item {
        Frame::Bulk(Some(data)) => Ok(data),
        _ if i == 0 => Err(KvError::Command("command name must be a bulk string".to_string())),
        _ => Err(KvError::Command(format!("command argument {} must be a bulk string", i))),
    });

    let name = match parts.next() {
        Some(name) => name?,
        None => return Err(KvError::Command("command array cannot be empty".to_string())),
    };
    let args = parts.collect::<Result<Vec<_>>>()?;

    Ok(Command::new(String::from_utf8_lossy(&name), args))
}

/// Encode a request (name followed by arguments) as an array of bulk strings
pub fn encode_command(parts: &[&[u8]]) -> Bytes {
    let frame = Frame::array(
        parts
            .iter()
            .map(|part| Frame::bulk(Bytes::copy_from_slice(part)))
            .collect(),
    );
    serialize(&frame)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete frame from a stream
pub fn read_frame<R: BufRead + ?Sized>(reader: &mut R) -> Result<Frame> {
    parse(reader)
}

/// Write a frame to a stream and flush it
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &Frame) -> Result<()> {
    writer.write_all(&serialize(frame))?;
    writer.flush()?;
    Ok(())
}
