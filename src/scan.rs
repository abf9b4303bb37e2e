//! Cursor-based key enumeration (`SCAN`).
//!
//! A `SCAN` reply is a two element array:
//!
//! ```text
//! *2
//! ├── $2 "17"              next cursor, decimal digits
//! └── *3                   this batch of keys
//!     ├── $1 "a"
//!     ├── $1 "b"
//!     └── $1 "c"
//! ```
//!
//! A pass starts at cursor 0 and ends when the server hands 0 back. The
//! cursor is opaque: it is not guaranteed to grow, and only the server
//! knows what it means. A batch may be empty while the pass continues.
//!
//! Keys that exist for the whole pass are returned at least once; keys
//! added or removed during the pass may or may not show up. Callers that
//! need uniqueness must dedupe.

use crate::command::Command;
use crate::error::{ClientError, Result};
use crate::executor::InstrumentedExecutor;
use crate::protocol::RespValue;
use crate::transport::Transport;

/// One decoded `SCAN` batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanPage {
    /// Cursor to send next; 0 means the pass is complete.
    pub cursor: u64,
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Builds `SCAN <cursor> [MATCH <pattern>] [COUNT <count>]`.
///
/// An empty pattern leaves out `MATCH` and a zero count leaves out `COUNT`,
/// so the server applies its own defaults.
pub fn scan_command(pattern: &str, count: usize, cursor: u64) -> Command {
    let mut cmd = Command::new("SCAN").arg(cursor);
    if !pattern.is_empty() {
        cmd = cmd.arg("MATCH").arg(pattern);
    }
    if count > 0 {
        cmd = cmd.arg("COUNT").arg(count);
    }
    cmd
}

/// Decodes a `SCAN` reply.
///
/// `Null` means the server sent no data and yields `Ok(None)`. Anything
/// else that is not `[cursor, [key, ...]]` is a [`ClientError::MalformedScan`].
pub fn decode_scan_reply(reply: RespValue) -> Result<Option<ScanPage>> {
    let items = match reply {
        RespValue::Null => return Ok(None),
        RespValue::Array(items) => items,
        other => return Err(malformed(format!("expected array, got {}", other.kind()))),
    };

    let [cursor, keys]: [RespValue; 2] = items
        .try_into()
        .map_err(|items: Vec<RespValue>| malformed(format!("expected 2 elements, got {}", items.len())))?;

    let cursor = parse_cursor(&cursor)?;
    let keys = match keys {
        RespValue::Array(keys) => keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| key_string(i, key))
            .collect::<Result<Vec<_>>>()?,
        other => return Err(malformed(format!("key batch is {}", other.kind()))),
    };

    Ok(Some(ScanPage { cursor, keys }))
}

fn parse_cursor(value: &RespValue) -> Result<u64> {
    let text = match value {
        RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
        RespValue::SimpleString(s) => Some(s.as_str()),
        other => return Err(malformed(format!("cursor is {}", other.kind()))),
    };

    text.filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed(format!("cursor is not a decimal number: {}", value)))
}

fn key_string(index: usize, key: RespValue) -> Result<String> {
    match key {
        RespValue::SimpleString(s) => Ok(s),
        RespValue::BulkString(b) => String::from_utf8(b.to_vec())
            .map_err(|_| malformed(format!("key {} is not valid UTF-8", index))),
        other => Err(malformed(format!("key {} is {}", index, other.kind()))),
    }
}

fn malformed(reason: String) -> ClientError {
    ClientError::MalformedScan(reason)
}

/// Walks one `SCAN` pass a page at a time.
///
/// Each [`next_page`](KeyScan::next_page) call sends exactly one `SCAN`.
/// The caller decides when to stop, so a pass over a large keyspace never
/// runs as a single unbounded loop inside the client.
pub struct KeyScan<'a, T> {
    exec: &'a InstrumentedExecutor<T>,
    pattern: String,
    count: usize,
    cursor: u64,
    finished: bool,
}

impl<'a, T: Transport> KeyScan<'a, T> {
    pub(crate) fn new(exec: &'a InstrumentedExecutor<T>, pattern: &str, count: usize) -> Self {
        Self {
            exec,
            pattern: pattern.to_string(),
            count,
            cursor: 0,
            finished: false,
        }
    }

    /// The cursor the next call will send.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches the next batch. Returns `Ok(None)` once the pass is over.
    ///
    /// A `Null` reply also ends the pass, since the server gave no cursor to
    /// continue from. On error the cursor is kept and the call may be
    /// repeated.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let command = scan_command(&self.pattern, self.count, self.cursor);
        let reply: RespValue = self.exec.execute(command, false).await?;
        match decode_scan_reply(reply)? {
            Some(page) => {
                self.cursor = page.cursor;
                self.finished = page.is_last();
                Ok(Some(page.keys))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use std::collections::HashSet;

    fn keys(names: &[&str]) -> RespValue {
        RespValue::array(names.iter().map(|n| RespValue::bulk_string(n.to_string())).collect())
    }

    #[test]
    fn test_decode_batch() {
        let reply = RespValue::array(vec![RespValue::bulk_string("17"), keys(&["a", "b", "c"])]);
        let page = decode_scan_reply(reply).unwrap().unwrap();
        assert_eq!(page.cursor, 17);
        assert_eq!(page.keys, vec!["a", "b", "c"]);
        assert!(!page.is_last());
    }

    #[test]
    fn test_decode_final_empty_batch() {
        let reply = RespValue::array(vec![RespValue::bulk_string("0"), keys(&[])]);
        let page = decode_scan_reply(reply).unwrap().unwrap();
        assert!(page.is_last());
        assert!(page.keys.is_empty());
    }

    #[test]
    fn test_decode_null_is_absent() {
        assert_eq!(decode_scan_reply(RespValue::Null).unwrap(), None);
    }

    #[test]
    fn test_decode_simple_string_elements() {
        let reply = RespValue::array(vec![
            RespValue::simple_string("5"),
            RespValue::array(vec![RespValue::simple_string("k")]),
        ]);
        let page = decode_scan_reply(reply).unwrap().unwrap();
        assert_eq!(page.cursor, 5);
        assert_eq!(page.keys, vec!["k"]);
    }

    #[test]
    fn test_decode_rejects_malformed_envelopes() {
        let cases = vec![
            RespValue::Integer(3),
            RespValue::array(vec![RespValue::bulk_string("0")]),
            RespValue::array(vec![RespValue::bulk_string("0"), keys(&[]), keys(&[])]),
            RespValue::array(vec![RespValue::Integer(0), keys(&[])]),
            RespValue::array(vec![RespValue::bulk_string("abc"), keys(&[])]),
            RespValue::array(vec![RespValue::bulk_string("-1"), keys(&[])]),
            RespValue::array(vec![RespValue::bulk_string(""), keys(&[])]),
            RespValue::array(vec![RespValue::bulk_string("0"), RespValue::bulk_string("a")]),
            RespValue::array(vec![
                RespValue::bulk_string("0"),
                RespValue::array(vec![RespValue::bulk_string("a"), RespValue::Integer(1)]),
            ]),
            RespValue::array(vec![
                RespValue::bulk_string("0"),
                RespValue::array(vec![RespValue::bulk_string(&b"\xff\xfe"[..])]),
            ]),
        ];

        for reply in cases {
            let shown = reply.to_string();
            assert!(
                matches!(decode_scan_reply(reply), Err(ClientError::MalformedScan(_))),
                "accepted {}",
                shown
            );
        }
    }

    #[test]
    fn test_scan_command_options() {
        let parts = |cmd: Command| -> Vec<String> {
            cmd.to_parts()
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect()
        };

        assert_eq!(
            parts(scan_command("user:*", 100, 42)),
            vec!["SCAN", "42", "MATCH", "user:*", "COUNT", "100"]
        );
        assert_eq!(parts(scan_command("", 0, 0)), vec!["SCAN", "0"]);
        assert_eq!(parts(scan_command("", 5, 0)), vec!["SCAN", "0", "COUNT", "5"]);
    }

    #[tokio::test]
    async fn test_key_scan_covers_every_key() {
        let store = MemoryTransport::new();
        for i in 0..300 {
            store.dispatch("SET", &[format!("item:{}", i).into(), "v".into()]);
        }
        let exec = InstrumentedExecutor::new(store);

        let mut scan = KeyScan::new(&exec, "item:*", 20);
        let mut seen = HashSet::new();
        let mut calls = 0;
        while let Some(batch) = scan.next_page().await.unwrap() {
            calls += 1;
            seen.extend(batch);
        }

        assert!(scan.is_finished());
        assert_eq!(scan.cursor(), 0);
        assert_eq!(seen.len(), 300);
        assert_eq!(exec.counter().snapshot().total, calls);
        assert!(scan.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_present_whole_pass_survive_churn() {
        let store = MemoryTransport::new();
        for i in 0..200 {
            store.dispatch("SET", &[format!("stable:{}", i).into(), "v".into()]);
        }
        let exec = InstrumentedExecutor::new(store);

        let mut scan = KeyScan::new(&exec, "stable:*", 10);
        let mut seen = HashSet::new();
        let mut round = 0;
        while let Some(batch) = scan.next_page().await.unwrap() {
            seen.extend(batch);
            // Insert and delete unrelated keys between pages
            let key = format!("churn:{}", round);
            exec.inner().dispatch("SET", &[key.clone().into(), "v".into()]);
            if round % 2 == 1 {
                exec.inner().dispatch("DEL", &[format!("churn:{}", round - 1).into()]);
            }
            round += 1;
        }

        assert_eq!(seen.len(), 200);
    }
}
