//! Client error type.

use crate::protocol::ParseError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias used throughout the client.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent bytes that are not valid RESP
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The server answered with an error reply
    #[error("server error: {0}")]
    Server(String),

    /// The reply was valid RESP but not the type the command returns
    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: &'static str,
    },

    /// A SCAN reply did not have the `[cursor, [keys...]]` shape
    #[error("malformed SCAN reply: {0}")]
    MalformedScan(String),

    /// The server closed the connection
    #[error("connection closed by server")]
    ConnectionClosed,

    /// A reply grew past the configured read buffer limit
    #[error("reply exceeds {limit} bytes")]
    ReplyTooLarge { limit: usize },

    /// No reply (or no connection) within the configured time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// AUTH or SELECT was rejected during connection setup
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The connection pool was closed
    #[error("connection pool closed")]
    PoolClosed,

    /// Caller passed an argument the command cannot accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// True for failures that leave the connection unusable, and that a
    /// fresh connection might not hit again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::Timeout(_)
        )
    }

    /// True if the connection that produced this error may be reused.
    pub fn keeps_connection(&self) -> bool {
        matches!(
            self,
            ClientError::Server(_)
                | ClientError::UnexpectedReply { .. }
                | ClientError::MalformedScan(_)
                | ClientError::InvalidArgument(_)
        )
    }

    pub(crate) fn unexpected(expected: &'static str, actual: &crate::protocol::RespValue) -> Self {
        ClientError::UnexpectedReply {
            expected,
            actual: actual.kind(),
        }
    }
}
