//! # FlashKV Client - Instrumented Access to RESP Key-Value Stores
//!
//! An async client for FlashKV, Redis, and other servers speaking the RESP
//! protocol. Every command goes through one instrumented executor that
//! times it and tells reads apart from writes, and key enumeration is
//! exposed both as a single `KEYS` search and as a caller-driven `SCAN`
//! cursor.
//!
//! ## Features
//!
//! - **Instrumented**: every command is timed on a shared, lock-free counter
//! - **Cursor scanning**: `SCAN` with a caller-owned cursor and strict reply decoding
//! - **Typed handles**: lists, hashes, queues and sets bound to one key
//! - **Pluggable transport**: a pooled TCP transport or an in-process store
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           FullClient                                    │
//! │                                                                         │
//! │  append / get_range / set_range / str_len / rename                      │
//! │  search (KEYS) / scan (SCAN) / get_list / get_hash / get_queue / get_set│
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────┐    ┌──────────────────┐    │
//! │  │         InstrumentedExecutor            │───>│   PerfCounter    │    │
//! │  │  start_count ─ send ─ stop_count        │    │ (atomics, shared)│    │
//! │  └───────────────────┬─────────────────────┘    └──────────────────┘    │
//! │                      │ dyn Transport                                    │
//! │          ┌───────────┴───────────┐                                      │
//! │          ▼                       ▼                                      │
//! │  ┌───────────────┐       ┌────────────────┐                             │
//! │  │     Pool      │       │ MemoryTransport│                             │
//! │  │ ┌───────────┐ │       │  (in-process)  │                             │
//! │  │ │Connection │ │       └────────────────┘                             │
//! │  │ │  RESP I/O │ │                                                      │
//! │  │ └───────────┘ │                                                      │
//! │  └───────────────┘                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use flashkv_client::{ClientConfig, FullClient};
//!
//! #[tokio::main]
//! async fn main() -> flashkv_client::Result<()> {
//!     let client = FullClient::connect(ClientConfig::default());
//!
//!     client.append("greeting", "Hello").await?;
//!     client.append("greeting", " World").await?;
//!     println!("{}", client.get_range("greeting", 0, 4).await?);
//!
//!     let mut cursor = 0;
//!     loop {
//!         for key in client.scan("user:*", 100, &mut cursor).await? {
//!             println!("{}", key);
//!         }
//!         if cursor == 0 {
//!             break;
//!         }
//!     }
//!
//!     println!("{}", client.perf());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! ### String Commands
//! - `APPEND key value`
//! - `GETRANGE key start end`
//! - `SETRANGE key offset value`
//! - `STRLEN key`
//! - `GET key` / `SET key value`
//!
//! ### Key Commands
//! - `DEL key` / `EXISTS key`
//! - `RENAME key newkey` / `RENAMENX key newkey`
//! - `KEYS pattern`
//! - `SCAN cursor [MATCH pattern] [COUNT count]`
//!
//! ### Collections
//! - Lists: `LLEN`, `RPUSH`, `LINDEX`, `LSET`, `LREM`, `LRANGE`
//! - Hashes: `HSET`, `HGET`, `HDEL`, `HLEN`, `HEXISTS`, `HGETALL`
//! - Queues: `RPUSH`, `LPOP`, `LLEN`
//! - Sets: `SADD`, `SREM`, `SISMEMBER`, `SCARD`, `SMEMBERS`
//!
//! Anything else can be sent with [`FullClient::execute`].
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP reply model, command encoding and reply decoder
//! - [`transport`]: the `Transport` trait, TCP pool and in-process store
//! - [`executor`]: instrumented command execution
//! - [`counter`]: performance counter
//! - [`scan`]: `SCAN` reply decoding and paging
//! - [`collections`]: typed collection handles
//!
//! ## Design Highlights
//!
//! ### One Choke Point
//!
//! No method talks to a transport directly. Everything funnels through
//! [`InstrumentedExecutor`], so the counter sees exactly one sample per
//! remote call, failures and cancelled calls included.
//!
//! ### Reads Retry, Writes Don't
//!
//! Each command carries a `write` flag. The pool replays a failed read on a
//! fresh connection but never replays a write, since the server may already
//! have applied it.
//!
//! ### Zero-Copy Decoding
//!
//! Replies are decoded from a `bytes::Bytes` buffer, so bulk strings are
//! slices of the read buffer rather than copies.

pub mod client;
pub mod collections;
pub mod command;
pub mod config;
pub mod counter;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod reply;
pub mod scan;
pub mod transport;

// Re-export commonly used types for convenience
pub use client::FullClient;
pub use collections::{KvHash, KvList, KvQueue, KvSet};
pub use command::{Command, ToArg};
pub use config::ClientConfig;
pub use counter::{CountToken, PerfCounter, PerfSnapshot};
pub use error::{ClientError, Result};
pub use executor::InstrumentedExecutor;
pub use protocol::{ParseError, ReplyDecoder, RespValue};
pub use reply::FromReply;
pub use scan::{KeyScan, ScanPage};
pub use transport::{Connection, MemoryTransport, Pool, Transport};

/// The default server port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of the FlashKV client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
