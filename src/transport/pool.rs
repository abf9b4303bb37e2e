//! Connection pool and the TCP [`Transport`].
//!
//! Connections are opened lazily, up to `pool_size`, and handed to one
//! command at a time. A connection goes back to the idle list only if its
//! command finished cleanly or failed with an error reply; anything that
//! may have left unread bytes on the socket (I/O error, timeout, a
//! cancelled future) drops the connection instead.

use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::RespValue;
use crate::transport::{into_result, Connection, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tracing::warn;

/// A bounded pool of [`Connection`]s to one server.
pub struct Pool {
    config: ClientConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Semaphore,
    opened: AtomicU64,
}

impl Pool {
    pub fn new(config: ClientConfig) -> Self {
        let size = config.pool_size.max(1);
        Self {
            idle: Mutex::new(Vec::with_capacity(size)),
            permits: Semaphore::new(size),
            opened: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connections currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Connections opened over the pool's lifetime.
    pub fn opened_count(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Rejects new commands and drops idle connections. Commands already
    /// running finish normally.
    pub fn close(&self) {
        self.permits.close();
        self.idle.lock().clear();
    }

    /// Runs one command on one connection, without retrying.
    async fn run_once(&self, command: &Command) -> Result<RespValue> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClientError::PoolClosed)?;

        let cached = self.idle.lock().pop();
        let mut conn = match cached {
            Some(conn) => conn,
            None => {
                let conn = Connection::connect(&self.config).await?;
                self.opened.fetch_add(1, Ordering::Relaxed);
                conn
            }
        };

        let result = conn.execute(command).await.and_then(into_result);
        match &result {
            Err(e) if !e.keeps_connection() => {
                warn!(server = %conn.peer_addr(), error = %e, "Discarding connection");
            }
            _ => self.idle.lock().push(conn),
        }
        result
    }
}

#[async_trait]
impl Transport for Pool {
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue> {
        let mut attempt = 0;
        loop {
            match self.run_once(command).await {
                Err(e) if !write && e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        command = command.name(),
                        attempt,
                        error = %e,
                        "Retrying read on a fresh connection"
                    );
                }
                result => return result,
            }
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.config.address())
            .field("idle", &self.idle_count())
            .field("opened", &self.opened_count())
            .finish()
    }
}
