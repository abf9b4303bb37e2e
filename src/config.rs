//! Client configuration.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::time::Duration;

/// Maximum bytes buffered while waiting for one reply (64 MB)
pub const DEFAULT_MAX_REPLY_SIZE: usize = 64 * 1024 * 1024;

/// Settings shared by every connection the client opens.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Sent with AUTH right after connecting
    pub password: Option<String>,
    /// Database index passed to SELECT when non-zero
    pub database: u32,
    /// Upper bound on simultaneously open connections
    pub pool_size: usize,
    /// How many times a failed read is retried on a fresh connection.
    /// Writes are never retried.
    pub retries: u32,
    /// Limit on establishing a TCP connection
    pub connect_timeout: Option<Duration>,
    /// Limit on waiting for one reply
    pub response_timeout: Option<Duration>,
    /// Largest reply the client will buffer
    pub max_reply_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            database: 0,
            pool_size: 8,
            retries: 2,
            connect_timeout: Some(Duration::from_secs(5)),
            response_timeout: Some(Duration::from_secs(10)),
            max_reply_size: DEFAULT_MAX_REPLY_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_addr(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Returns the server address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
