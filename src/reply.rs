//! Reply coercion.
//!
//! Each command knows what type its reply should have; [`FromReply`] turns
//! the raw [`RespValue`] into that type or reports a mismatch. Error replies
//! never reach these impls: the executor converts them into
//! [`ClientError::Server`] first.

use crate::error::{ClientError, Result};
use crate::protocol::RespValue;
use bytes::Bytes;

pub trait FromReply: Sized {
    fn from_reply(value: RespValue) -> Result<Self>;
}

impl FromReply for RespValue {
    fn from_reply(value: RespValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromReply for i64 {
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::Integer(n) => Ok(n),
            RespValue::BulkString(ref b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ClientError::unexpected("integer", &value)),
            other => Err(ClientError::unexpected("integer", &other)),
        }
    }
}

impl FromReply for usize {
    fn from_reply(value: RespValue) -> Result<Self> {
        let n = i64::from_reply(value)?;
        usize::try_from(n).map_err(|_| ClientError::UnexpectedReply {
            expected: "non-negative integer",
            actual: "negative integer",
        })
    }
}

impl FromReply for bool {
    /// `+OK` and any non-zero integer are `true`; `:0` is `false`.
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::Integer(n) => Ok(n != 0),
            RespValue::SimpleString(ref s) if s == "OK" => Ok(true),
            other => Err(ClientError::unexpected("boolean", &other)),
        }
    }
}

impl FromReply for Bytes {
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::BulkString(b) => Ok(b),
            RespValue::SimpleString(s) => Ok(Bytes::from(s)),
            other => Err(ClientError::unexpected("string", &other)),
        }
    }
}

impl FromReply for String {
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::SimpleString(s) => Ok(s),
            RespValue::BulkString(b) => String::from_utf8(b.to_vec())
                .map_err(|_| ClientError::UnexpectedReply {
                    expected: "UTF-8 string",
                    actual: "binary bulk string",
                }),
            RespValue::Integer(n) => Ok(n.to_string()),
            other => Err(ClientError::unexpected("string", &other)),
        }
    }
}

impl<T: FromReply> FromReply for Option<T> {
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::Null => Ok(None),
            other => T::from_reply(other).map(Some),
        }
    }
}

impl<T: FromReply> FromReply for Vec<T> {
    /// A null reply is an empty list.
    fn from_reply(value: RespValue) -> Result<Self> {
        match value {
            RespValue::Array(items) => items.into_iter().map(T::from_reply).collect(),
            RespValue::Null => Ok(Vec::new()),
            other => Err(ClientError::unexpected("array", &other)),
        }
    }
}
