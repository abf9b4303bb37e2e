//! Incremental RESP Reply Decoder
//!
//! Replies arrive on a TCP stream, so a read may hold half a reply or
//! several of them. Decoding happens in two passes over the buffered bytes:
//!
//! 1. [`ReplyDecoder::frame_end`] walks the buffer without allocating and
//!    finds where the first complete reply ends, or reports that more bytes
//!    are needed.
//! 2. The complete frame is split off the buffer and frozen, and bulk
//!    strings are handed out as `Bytes` slices of that frame (no copy).
//!
//! The decoder returns:
//! - `Ok(Some(value))` - one reply was removed from the buffer
//! - `Ok(None)` - the buffer holds an incomplete reply; read more
//! - `Err(ParseError)` - the server sent something that is not RESP

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Errors that can occur while decoding a reply.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a status or error line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, too deep, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A bulk string exceeds the configured limit
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Stateless reply decoder; only carries its limits.
#[derive(Debug, Clone)]
pub struct ReplyDecoder {
    max_bulk: usize,
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self {
            max_bulk: MAX_BULK_SIZE,
        }
    }

    /// A decoder that rejects bulk strings longer than `max_bulk` bytes.
    pub fn with_max_bulk(max_bulk: usize) -> Self {
        Self { max_bulk }
    }

    /// Removes one complete reply from the front of `buf`.
    pub fn decode(&self, buf: &mut BytesMut) -> ParseResult<Option<RespValue>> {
        let end = match self.frame_end(buf, 0, 0)? {
            Some(end) => end,
            None => return Ok(None),
        };

        let frame = buf.split_to(end).freeze();
        let mut pos = 0;
        let value = read_value(&frame, &mut pos)?;
        debug_assert_eq!(pos, end);
        Ok(Some(value))
    }

    /// Returns the offset just past the reply that starts at `start`, or
    /// `None` if the buffer does not yet contain all of it.
    fn frame_end(&self, buf: &[u8], start: usize, depth: usize) -> ParseResult<Option<usize>> {
        if start >= buf.len() {
            return Ok(None);
        }

        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        let line_end = match find_crlf(&buf[start + 1..]) {
            Some(pos) => start + 1 + pos,
            None => return Ok(None),
        };
        let line = &buf[start + 1..line_end];
        let after_line = line_end + CRLF.len();

        match buf[start] {
            prefix::SIMPLE_STRING | prefix::ERROR => Ok(Some(after_line)),
            prefix::INTEGER => {
                parse_int(line)?;
                Ok(Some(after_line))
            }
            prefix::BULK_STRING => {
                let length = parse_int(line)?;
                if length == -1 {
                    return Ok(Some(after_line));
                }
                if length < 0 {
                    return Err(ParseError::InvalidBulkLength(length));
                }

                let length = length as usize;
                if length > self.max_bulk {
                    return Err(ParseError::MessageTooLarge {
                        size: length,
                        max: self.max_bulk,
                    });
                }

                let end = after_line + length + CRLF.len();
                if buf.len() < end {
                    return Ok(None);
                }
                if &buf[end - CRLF.len()..end] != CRLF {
                    return Err(ParseError::ProtocolError(
                        "bulk string missing trailing CRLF".to_string(),
                    ));
                }
                Ok(Some(end))
            }
            prefix::ARRAY => {
                let count = parse_int(line)?;
                if count == -1 {
                    return Ok(Some(after_line));
                }
                if count < 0 {
                    return Err(ParseError::InvalidArrayLength(count));
                }

                let mut pos = after_line;
                for _ in 0..count {
                    match self.frame_end(buf, pos, depth + 1)? {
                        Some(end) => pos = end,
                        None => return Ok(None),
                    }
                }
                Ok(Some(pos))
            }
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }
}

/// Builds a value out of a frame already checked by `frame_end`.
fn read_value(frame: &Bytes, pos: &mut usize) -> ParseResult<RespValue> {
    let start = *pos;
    let line_end = find_crlf(&frame[start + 1..])
        .map(|p| start + 1 + p)
        .ok_or_else(|| ParseError::ProtocolError("truncated frame".to_string()))?;
    let line = &frame[start + 1..line_end];
    *pos = line_end + CRLF.len();

    match frame[start] {
        prefix::SIMPLE_STRING => Ok(RespValue::SimpleString(utf8(line)?.to_string())),
        prefix::ERROR => Ok(RespValue::Error(utf8(line)?.to_string())),
        prefix::INTEGER => Ok(RespValue::Integer(parse_int(line)?)),
        prefix::BULK_STRING => {
            let length = parse_int(line)?;
            if length < 0 {
                return Ok(RespValue::Null);
            }
            let length = length as usize;
            let data = frame.slice(*pos..*pos + length);
            *pos += length + CRLF.len();
            Ok(RespValue::BulkString(data))
        }
        prefix::ARRAY => {
            let count = parse_int(line)?;
            if count < 0 {
                return Ok(RespValue::Null);
            }
            let mut elements = Vec::with_capacity((count as usize).min(1024));
            for _ in 0..count {
                elements.push(read_value(frame, pos)?);
            }
            Ok(RespValue::Array(elements))
        }
        other => Err(ParseError::UnknownPrefix(other)),
    }
}

fn utf8(line: &[u8]) -> ParseResult<&str> {
    std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))
}

fn parse_int(line: &[u8]) -> ParseResult<i64> {
    let s = utf8(line)?;
    s.parse()
        .map_err(|_| ParseError::InvalidInteger(s.to_string()))
}

/// Position of the `\r` of the first CRLF in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single reply from a byte slice.
///
/// Returns the value and the number of bytes it occupied.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let mut owned = BytesMut::from(buf);
    let before = owned.len();
    Ok(ReplyDecoder::new()
        .decode(&mut owned)?
        .map(|value| (value, before - owned.len())))
}
