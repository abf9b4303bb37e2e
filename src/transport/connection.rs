//! A single client connection.
//!
//! ## Request Lifecycle
//!
//! ```text
//! 1. Encode command into the write buffer
//!        │
//!        ▼
//! 2. write_all + flush
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Read Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Try to decode a reply   │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │ incomplete    │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Reply handed back to the caller
//! ```
//!
//! TCP is a stream, so a read may return part of a reply. Bytes
//! accumulate in a `BytesMut` until the decoder finds a complete frame.

use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{ReplyDecoder, RespValue};
use bytes::BytesMut;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// One TCP connection speaking RESP.
pub struct Connection {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Server address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet decoded
    read_buf: BytesMut,

    /// Reused between commands
    write_buf: BytesMut,

    decoder: ReplyDecoder,

    max_reply_size: usize,

    response_timeout: Option<Duration>,
}

impl Connection {
    /// Opens a connection and runs AUTH / SELECT as configured.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let address = config.address();
        let stream = with_timeout(config.connect_timeout, TcpStream::connect(&address)).await??;
        stream.set_nodelay(true)?;
        let addr = stream.peer_addr()?;

        let mut conn = Self {
            stream: BufWriter::new(stream),
            addr,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            decoder: ReplyDecoder::with_max_bulk(config.max_reply_size),
            max_reply_size: config.max_reply_size,
            response_timeout: config.response_timeout,
        };
        debug!(server = %conn.addr, "Connected");

        if let Some(password) = &config.password {
            match conn.execute(&Command::new("AUTH").arg(password)).await? {
                RespValue::SimpleString(s) if s == "OK" => {}
                RespValue::Error(e) => return Err(ClientError::Auth(e)),
                other => {
                    return Err(ClientError::Auth(format!(
                        "unexpected AUTH reply: {}",
                        other
                    )))
                }
            }
        }

        if config.database != 0 {
            match conn
                .execute(&Command::new("SELECT").arg(config.database))
                .await?
            {
                RespValue::SimpleString(s) if s == "OK" => {}
                RespValue::Error(e) => return Err(ClientError::Server(e)),
                other => return Err(ClientError::unexpected("OK", &other)),
            }
        }

        Ok(conn)
    }

    /// Returns the server's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends a command and reads its reply.
    ///
    /// Error replies come back as `Ok(RespValue::Error(..))`; the caller
    /// decides what they mean.
    pub async fn execute(&mut self, command: &Command) -> Result<RespValue> {
        self.send(command).await?;
        let limit = self.response_timeout;
        with_timeout(limit, self.read_reply()).await?
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        self.write_buf.clear();
        command.encode_into(&mut self.write_buf);
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        trace!(
            server = %self.addr,
            command = command.name(),
            bytes = self.write_buf.len(),
            "Sent command"
        );
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<RespValue> {
        loop {
            if let Some(reply) = self.decoder.decode(&mut self.read_buf)? {
                trace!(
                    server = %self.addr,
                    remaining = self.read_buf.len(),
                    "Decoded reply"
                );
                return Ok(reply);
            }
            self.read_more_data().await?;
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<()> {
        if self.read_buf.len() >= self.max_reply_size {
            return Err(ClientError::ReplyTooLarge {
                limit: self.max_reply_size,
            });
        }

        if self.read_buf.capacity() - self.read_buf.len() < 1024 {
            self.read_buf.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.read_buf).await?;
        if n == 0 {
            debug!(server = %self.addr, buffered = self.read_buf.len(), "Server closed connection");
            return Err(ClientError::ConnectionClosed);
        }

        trace!(server = %self.addr, bytes = n, "Read data");
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("buffered", &self.read_buf.len())
            .finish()
    }
}

/// Runs `fut` under an optional time limit.
async fn with_timeout<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(limit)),
        None => Ok(fut.await),
    }
}
