//! Transport Layer
//!
//! A transport takes one [`Command`] and returns the server's reply. The
//! executor only sees the [`Transport`] trait, so the same instrumented
//! client runs over TCP or against the in-process store.
//!
//! ```text
//!   FullClient ──> InstrumentedExecutor ──> dyn Transport
//!                                              │
//!                        ┌─────────────────────┼──────────────────┐
//!                        ▼                                        ▼
//!                ┌──────────────┐                        ┌────────────────┐
//!                │     Pool     │                        │ MemoryTransport│
//!                │ (Connection  │                        │  (in-process)  │
//!                │  per task)   │                        └────────────────┘
//!                └──────────────┘
//! ```
//!
//! The `write` flag travels with every command. It does not change what
//! is sent; it tells the transport whether the command may be replayed.
//! The pool retries failed reads on a fresh connection and never retries
//! writes.

pub mod connection;
pub mod memory;
pub mod pool;

#[cfg(test)]
pub(crate) mod scripted;
#[cfg(test)]
pub(crate) mod test_server;

pub use connection::Connection;
pub use memory::MemoryTransport;
pub use pool::Pool;

use crate::command::Command;
use crate::error::{ClientError, Result};
use crate::protocol::RespValue;
use async_trait::async_trait;
use std::sync::Arc;

/// Sends commands to a store and returns its replies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues `command` and waits for its reply.
    ///
    /// Error replies are returned as [`ClientError::Server`], never as
    /// `Ok(RespValue::Error(..))`. A `Null` reply is returned as is.
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue> {
        (**self).send_command(command, write).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue> {
        (**self).send_command(command, write).await
    }
}

/// Turns a top-level error reply into [`ClientError::Server`].
pub(crate) fn into_result(reply: RespValue) -> Result<RespValue> {
    match reply {
        RespValue::Error(message) => Err(ClientError::Server(message)),
        other => Ok(other),
    }
}
