//! RESP Protocol Implementation (client side)
//!
//! ## Modules
//!
//! - `types`: the `RespValue` reply model and command frame encoding
//! - `parser`: incremental, zero-copy reply decoder
//!
//! ## Example
//!
//! ```
//! use flashkv_client::protocol::{encode_command, ReplyDecoder, RespValue};
//! use bytes::{Bytes, BytesMut};
//!
//! let mut out = BytesMut::new();
//! encode_command(&[Bytes::from("STRLEN"), Bytes::from("name")], &mut out);
//! assert_eq!(&out[..], b"*2\r\n$6\r\nSTRLEN\r\n$4\r\nname\r\n");
//!
//! let mut incoming = BytesMut::from(&b":4\r\n"[..]);
//! let reply = ReplyDecoder::new().decode(&mut incoming).unwrap();
//! assert_eq!(reply, Some(RespValue::Integer(4)));
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, ReplyDecoder};
pub use types::{encode_command, RespValue};
