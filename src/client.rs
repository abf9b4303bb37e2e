//! The client facade.
//!
//! [`FullClient`] owns one [`InstrumentedExecutor`] and exposes the string,
//! key, search and scan commands as typed methods. Every method is one
//! executor call; the `write` flag is fixed per command.

use crate::collections::{KvHash, KvList, KvQueue, KvSet};
use crate::command::{Command, ToArg};
use crate::config::ClientConfig;
use crate::counter::{PerfCounter, PerfSnapshot};
use crate::error::Result;
use crate::executor::InstrumentedExecutor;
use crate::protocol::RespValue;
use crate::reply::FromReply;
use crate::scan::{decode_scan_reply, scan_command, KeyScan, ScanPage};
use crate::transport::{Pool, Transport};
use bytes::Bytes;
use std::sync::Arc;

/// Client for a RESP key-value store.
///
/// Generic over the transport so the same client runs over a TCP
/// [`Pool`] or an in-process [`MemoryTransport`](crate::MemoryTransport).
pub struct FullClient<T = Pool> {
    exec: InstrumentedExecutor<T>,
}

impl FullClient<Pool> {
    /// Creates a client backed by a connection pool. No connection is
    /// opened until the first command.
    pub fn connect(config: ClientConfig) -> Self {
        Self::with_transport(Pool::new(config))
    }
}

impl<T: Transport> FullClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            exec: InstrumentedExecutor::new(transport),
        }
    }

    pub fn executor(&self) -> &InstrumentedExecutor<T> {
        &self.exec
    }

    pub fn transport(&self) -> &T {
        self.exec.inner()
    }

    pub fn counter(&self) -> &Arc<PerfCounter> {
        self.exec.counter()
    }

    pub fn perf(&self) -> PerfSnapshot {
        self.exec.counter().snapshot()
    }

    /// Runs an arbitrary command through the instrumented executor.
    pub async fn execute<R: FromReply>(&self, command: Command, write: bool) -> Result<R> {
        self.exec.execute(command, write).await
    }

    // ========================================================================
    // Basic key commands
    // ========================================================================

    pub async fn ping(&self) -> Result<String> {
        self.exec.execute(Command::new("PING"), false).await
    }

    pub async fn get(&self, key: impl ToArg) -> Result<Option<Bytes>> {
        self.exec.execute(Command::new("GET").arg(key), false).await
    }

    pub async fn set(&self, key: impl ToArg, value: impl ToArg) -> Result<()> {
        let _: RespValue = self
            .exec
            .execute(Command::new("SET").arg(key).arg(value), true)
            .await?;
        Ok(())
    }

    /// DEL; returns whether the key existed.
    pub async fn remove(&self, key: impl ToArg) -> Result<bool> {
        self.exec.execute(Command::new("DEL").arg(key), true).await
    }

    pub async fn contains_key(&self, key: impl ToArg) -> Result<bool> {
        self.exec.execute(Command::new("EXISTS").arg(key), false).await
    }

    // ========================================================================
    // String range commands
    // ========================================================================

    /// Appends `value` to the string at `key` and returns the new length.
    /// A missing key is created.
    pub async fn append(&self, key: impl ToArg, value: impl ToArg) -> Result<usize> {
        self.exec
            .execute(Command::new("APPEND").arg(key).arg(value), true)
            .await
    }

    /// Substring between `start` and `end`, both inclusive. Negative
    /// offsets count from the end of the string.
    ///
    /// Offsets are in bytes, so a range may split a multibyte character;
    /// the partial character is replaced with U+FFFD.
    pub async fn get_range(&self, key: impl ToArg, start: i64, end: i64) -> Result<String> {
        let range: Bytes = self
            .exec
            .execute(Command::new("GETRANGE").arg(key).arg(start).arg(end), false)
            .await?;
        Ok(String::from_utf8_lossy(&range).into_owned())
    }

    /// Overwrites part of the string at `key` starting at `offset`, padding
    /// with zero bytes if needed. Returns the resulting length.
    pub async fn set_range(&self, key: impl ToArg, offset: u64, value: impl ToArg) -> Result<usize> {
        self.exec
            .execute(Command::new("SETRANGE").arg(key).arg(offset).arg(value), true)
            .await
    }

    pub async fn str_len(&self, key: impl ToArg) -> Result<usize> {
        self.exec.execute(Command::new("STRLEN").arg(key), false).await
    }

    /// Renames `key` to `new_key`.
    ///
    /// With `overwrite` this is `RENAME` and an existing `new_key` is
    /// replaced. Without it this is `RENAMENX`, which returns `false` and
    /// changes nothing when `new_key` already exists.
    pub async fn rename(&self, key: impl ToArg, new_key: impl ToArg, overwrite: bool) -> Result<bool> {
        let name = if overwrite { "RENAME" } else { "RENAMENX" };
        self.exec
            .execute(Command::new(name).arg(key).arg(new_key), true)
            .await
    }

    // ========================================================================
    // Key search
    // ========================================================================

    /// All keys matching `pattern`, in one `KEYS` round-trip.
    ///
    /// `KEYS` blocks the server while it walks the whole keyspace. Prefer
    /// [`scan`](Self::scan) on large databases.
    pub async fn search(&self, pattern: &str) -> Result<Vec<String>> {
        self.exec.execute(Command::new("KEYS").arg(pattern), false).await
    }

    /// One `SCAN` step.
    ///
    /// Sends `*cursor`, returns the keys of this batch and stores the next
    /// cursor back into `*cursor`. Start a pass with 0; the pass is over
    /// when the cursor comes back as 0. A `Null` reply returns no keys and
    /// leaves the cursor as it was. On error the cursor is not touched.
    pub async fn scan(&self, pattern: &str, count: usize, cursor: &mut u64) -> Result<Vec<String>> {
        match self.scan_page(pattern, count, *cursor).await? {
            Some(page) => {
                *cursor = page.cursor;
                Ok(page.keys)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Value-returning form of [`scan`](Self::scan). `None` for a `Null`
    /// reply.
    pub async fn scan_page(&self, pattern: &str, count: usize, cursor: u64) -> Result<Option<ScanPage>> {
        let reply: RespValue = self
            .exec
            .execute(scan_command(pattern, count, cursor), false)
            .await?;
        decode_scan_reply(reply)
    }

    /// A page-at-a-time `SCAN` pass starting from cursor 0.
    pub fn keys_scan(&self, pattern: &str, count: usize) -> KeyScan<'_, T> {
        KeyScan::new(&self.exec, pattern, count)
    }

    // ========================================================================
    // Collection handles
    // ========================================================================

    pub fn get_list<V: ToArg + FromReply>(&self, key: impl Into<String>) -> KvList<'_, T, V> {
        KvList::new(&self.exec, key.into())
    }

    pub fn get_hash<V: ToArg + FromReply>(&self, key: impl Into<String>) -> KvHash<'_, T, V> {
        KvHash::new(&self.exec, key.into())
    }

    pub fn get_queue<V: ToArg + FromReply>(&self, key: impl Into<String>) -> KvQueue<'_, T, V> {
        KvQueue::new(&self.exec, key.into())
    }

    pub fn get_set<V: ToArg + FromReply>(&self, key: impl Into<String>) -> KvSet<'_, T, V> {
        KvSet::new(&self.exec, key.into())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FullClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullClient").field("exec", &self.exec).finish()
    }
}
