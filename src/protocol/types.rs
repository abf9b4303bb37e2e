//! RESP (Redis Serialization Protocol) Reply Model
//!
//! Everything a server sends back is one of the variants of [`RespValue`].
//! The client only ever *sends* arrays of bulk strings (see
//! [`encode_command`]), but it has to understand every reply type.
//!
//! ## Wire Format
//!
//! Each RESP type starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String (`$-1` is null)
//! - `*` Array (`*-1` is null)
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! A `SCAN` reply carrying cursor `17` and two keys:
//!
//! ```text
//! *2\r\n$2\r\n17\r\n*2\r\n$1\r\na\r\n$1\r\nb\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single reply (or reply element) received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply such as `+OK` or `+PONG`.
    SimpleString(String),

    /// Error reply such as `-ERR no such key`.
    Error(String),

    /// 64-bit signed integer reply.
    Integer(i64),

    /// Binary-safe string. Keys, values and the `SCAN` cursor arrive this way.
    BulkString(Bytes),

    /// Null bulk string or null array: "no data".
    Null,

    /// Array reply; elements may be of any type, including nested arrays.
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// `+OK`
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Short type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Null => "null",
            RespValue::Array(_) => "array",
        }
    }

    /// Serializes the value in wire format.
    ///
    /// Clients never send anything but command arrays; this exists so test
    /// servers and benchmarks can produce canned replies.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Text of a simple or bulk string, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            RespValue::Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

/// Writes a command as an array of bulk strings: `*<n>\r\n($<len>\r\n<arg>\r\n)*`.
pub fn encode_command(args: &[Bytes], buf: &mut BytesMut) {
    buf.reserve(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.put_u8(prefix::ARRAY);
    buf.put_slice(args.len().to_string().as_bytes());
    buf.put_slice(CRLF);

    for arg in args {
        buf.put_u8(prefix::BULK_STRING);
        buf.put_slice(arg.len().to_string().as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(arg);
        buf.put_slice(CRLF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let mut buf = BytesMut::new();
        encode_command(
            &[Bytes::from("APPEND"), Bytes::from("k"), Bytes::from("foo")],
            &mut buf,
        );
        assert_eq!(&buf[..], b"*3\r\n$6\r\nAPPEND\r\n$1\r\nk\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn test_encode_binary_argument() {
        let mut buf = BytesMut::new();
        encode_command(&[Bytes::from_static(b"a\r\nb")], &mut buf);
        assert_eq!(&buf[..], b"*1\r\n$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_serialize_scan_envelope() {
        let reply = RespValue::array(vec![
            RespValue::bulk_string("17"),
            RespValue::array(vec![RespValue::bulk_string("a"), RespValue::bulk_string("b")]),
        ]);
        assert_eq!(
            reply.serialize(),
            b"*2\r\n$2\r\n17\r\n*2\r\n$1\r\na\r\n$1\r\nb\r\n"
        );
    }

    #[test]
    fn test_serialize_null() {
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RespValue::ok().kind(), "simple string");
        assert_eq!(RespValue::Null.kind(), "null");
        assert_eq!(RespValue::array(vec![]).kind(), "array");
    }

    #[test]
    fn test_as_str() {
        assert_eq!(RespValue::bulk_string("user:1").as_str(), Some("user:1"));
        assert_eq!(RespValue::bulk_string(vec![0xff, 0xfe]).as_str(), None);
        assert_eq!(RespValue::integer(3).as_str(), None);
    }

    #[test]
    fn test_display_array() {
        let value = RespValue::array(vec![RespValue::bulk_string("a"), RespValue::integer(2)]);
        assert_eq!(value.to_string(), "1) \"a\"\n2) (integer) 2");
    }
}
