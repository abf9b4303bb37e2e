//! In-process store behind the [`Transport`] trait.
//!
//! `MemoryTransport` answers commands the way a RESP server would, without
//! a socket. It is what the client's own tests run against, and it is
//! handy for applications that want to exercise code built on the client
//! without a server.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MemoryTransport                          │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐      ┌──────────┐   │
//! │  │ Bucket 0 │ │ Bucket 1 │ │ Bucket 2 │ ...  │Bucket 63 │   │
//! │  │ HashMap  │ │ HashMap  │ │ HashMap  │      │ HashMap  │   │
//! │  └──────────┘ └──────────┘ └──────────┘      └──────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always lives in the bucket its hash selects. `SCAN` walks the
//! buckets in order and the cursor is the next bucket to visit, so a key
//! that exists for a whole pass is reported at least once no matter what
//! else is inserted or deleted in between.

use crate::command::Command;
use crate::error::Result;
use crate::protocol::RespValue;
use crate::transport::{into_result, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of scan buckets.
const NUM_BUCKETS: usize = 64;

/// Default SCAN page size when COUNT is not given (same as Redis)
const DEFAULT_SCAN_COUNT: usize = 10;

/// Largest string SETRANGE may produce (512 MB, same as Redis)
const MAX_STRING_SIZE: usize = 512 * 1024 * 1024;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

type Bucket = HashMap<Bytes, Value>;

/// Command outcome before it is turned into a reply; `Err` holds the
/// error line.
type Outcome = std::result::Result<RespValue, String>;

#[derive(Debug)]
enum Value {
    Str(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    Set(HashSet<Bytes>),
}

/// What a collection command does when its key does not exist.
#[derive(Debug, Clone, Copy)]
enum Missing {
    Create,
    Zero,
    Null,
    Empty,
    NoSuchKey,
}

impl Missing {
    fn reply(self) -> Outcome {
        match self {
            Missing::Create | Missing::Zero => Ok(RespValue::integer(0)),
            Missing::Null => Ok(RespValue::Null),
            Missing::Empty => Ok(RespValue::array(vec![])),
            Missing::NoSuchKey => Err("ERR no such key".to_string()),
        }
    }
}

impl Value {
    fn is_empty_collection(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(l) => l.is_empty(),
            Value::Hash(h) => h.is_empty(),
            Value::Set(s) => s.is_empty(),
        }
    }
}

/// An in-memory key-value store that speaks the client's command set.
pub struct MemoryTransport {
    buckets: RwLock<Vec<Bucket>>,
    commands: AtomicU64,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("keys", &self.len())
            .field("commands", &self.command_count())
            .finish()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new((0..NUM_BUCKETS).map(|_| HashMap::new()).collect()),
            commands: AtomicU64::new(0),
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.buckets.read().iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commands answered so far.
    pub fn command_count(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    /// Executes one command and returns the raw reply, error replies
    /// included.
    pub fn dispatch(&self, name: &str, args: &[Bytes]) -> RespValue {
        self.commands.fetch_add(1, Ordering::Relaxed);
        let name = name.to_ascii_uppercase();
        self.run(&name, args).unwrap_or_else(RespValue::Error)
    }

    fn run(&self, cmd: &str, args: &[Bytes]) -> Outcome {
        match cmd {
            "PING" => match args {
                [] => Ok(RespValue::simple_string("PONG")),
                [msg] => Ok(RespValue::bulk_string(msg.clone())),
                _ => Err(arity(cmd)),
            },

            // Strings
            "GET" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.read(key, |v| match v {
                    None => Ok(RespValue::Null),
                    Some(Value::Str(s)) => Ok(RespValue::bulk_string(s.clone())),
                    Some(_) => Err(WRONGTYPE.to_string()),
                })
            }
            "SET" => {
                let [key, value] = args else { return Err(arity(cmd)) };
                self.write(key, |entry| {
                    *entry = Some(Value::Str(value.clone()));
                    Ok(RespValue::ok())
                })
            }
            "APPEND" => {
                let [key, value] = args else { return Err(arity(cmd)) };
                self.write(key, |entry| match entry {
                    None => {
                        *entry = Some(Value::Str(value.clone()));
                        Ok(RespValue::integer(value.len() as i64))
                    }
                    Some(Value::Str(s)) => {
                        let mut joined = Vec::with_capacity(s.len() + value.len());
                        joined.extend_from_slice(s);
                        joined.extend_from_slice(value);
                        let len = joined.len();
                        *s = Bytes::from(joined);
                        Ok(RespValue::integer(len as i64))
                    }
                    Some(_) => Err(WRONGTYPE.to_string()),
                })
            }
            "GETRANGE" => {
                let [key, start, end] = args else { return Err(arity(cmd)) };
                let (start, end) = (int_arg(start)?, int_arg(end)?);
                self.read(key, |v| match v {
                    None => Ok(RespValue::bulk_string(Bytes::new())),
                    Some(Value::Str(s)) => Ok(RespValue::bulk_string(
                        match normalize_range(start, end, s.len()) {
                            Some((from, to)) => s.slice(from..=to),
                            None => Bytes::new(),
                        },
                    )),
                    Some(_) => Err(WRONGTYPE.to_string()),
                })
            }
            "SETRANGE" => {
                let [key, offset, value] = args else { return Err(arity(cmd)) };
                let offset = usize::try_from(int_arg(offset)?)
                    .map_err(|_| "ERR offset is out of range".to_string())?;
                self.write(key, |entry| {
                    let current = match entry {
                        None if value.is_empty() => return Ok(RespValue::integer(0)),
                        None => Vec::new(),
                        Some(Value::Str(s)) => s.to_vec(),
                        Some(_) => return Err(WRONGTYPE.to_string()),
                    };
                    if value.is_empty() {
                        return Ok(RespValue::integer(current.len() as i64));
                    }
                    let end = offset
                        .checked_add(value.len())
                        .filter(|end| *end <= MAX_STRING_SIZE)
                        .ok_or_else(|| "ERR string exceeds maximum allowed size".to_string())?;
                    let mut buf = current;
                    if buf.len() < end {
                        buf.resize(end, 0);
                    }
                    buf[offset..end].copy_from_slice(value);
                    let len = buf.len();
                    *entry = Some(Value::Str(Bytes::from(buf)));
                    Ok(RespValue::integer(len as i64))
                })
            }
            "STRLEN" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.read(key, |v| match v {
                    None => Ok(RespValue::integer(0)),
                    Some(Value::Str(s)) => Ok(RespValue::integer(s.len() as i64)),
                    Some(_) => Err(WRONGTYPE.to_string()),
                })
            }

            // Keys
            "DEL" => {
                if args.is_empty() {
                    return Err(arity(cmd));
                }
                let mut buckets = self.buckets.write();
                let removed = args
                    .iter()
                    .filter(|key| buckets[bucket_index(key)].remove(*key).is_some())
                    .count();
                Ok(RespValue::integer(removed as i64))
            }
            "EXISTS" => {
                if args.is_empty() {
                    return Err(arity(cmd));
                }
                let buckets = self.buckets.read();
                let found = args
                    .iter()
                    .filter(|key| buckets[bucket_index(key)].contains_key(*key))
                    .count();
                Ok(RespValue::integer(found as i64))
            }
            "RENAME" | "RENAMENX" => {
                let [key, new_key] = args else { return Err(arity(cmd)) };
                self.rename(key, new_key, cmd == "RENAME")
            }
            "KEYS" => {
                let [pattern] = args else { return Err(arity(cmd)) };
                let buckets = self.buckets.read();
                let keys = buckets
                    .iter()
                    .flat_map(|bucket| bucket.keys())
                    .filter(|key| glob_match(pattern, key))
                    .map(|key| RespValue::bulk_string(key.clone()))
                    .collect();
                Ok(RespValue::array(keys))
            }
            "SCAN" => self.scan(args),

            // Lists
            "LPUSH" | "RPUSH" => {
                let [key, values @ ..] = args else { return Err(arity(cmd)) };
                if values.is_empty() {
                    return Err(arity(cmd));
                }
                self.with_list(key, Missing::Create, |list| {
                    for v in values {
                        if cmd == "LPUSH" {
                            list.push_front(v.clone());
                        } else {
                            list.push_back(v.clone());
                        }
                    }
                    Ok(RespValue::integer(list.len() as i64))
                })
            }
            "LPOP" | "RPOP" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_list(key, Missing::Null, |list| {
                    let popped = if cmd == "LPOP" {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    };
                    Ok(popped.map(RespValue::bulk_string).unwrap_or(RespValue::Null))
                })
            }
            "LLEN" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_list(key, Missing::Zero, |list| Ok(RespValue::integer(list.len() as i64)))
            }
            "LINDEX" => {
                let [key, index] = args else { return Err(arity(cmd)) };
                let index = int_arg(index)?;
                self.with_list(key, Missing::Null, |list| {
                    Ok(list_position(index, list.len())
                        .and_then(|i| list.get(i).cloned())
                        .map(RespValue::bulk_string)
                        .unwrap_or(RespValue::Null))
                })
            }
            "LSET" => {
                let [key, index, value] = args else { return Err(arity(cmd)) };
                let index = int_arg(index)?;
                self.with_list(key, Missing::NoSuchKey, |list| {
                    let slot = list_position(index, list.len())
                        .and_then(|i| list.get_mut(i))
                        .ok_or_else(|| "ERR index out of range".to_string())?;
                    *slot = value.clone();
                    Ok(RespValue::ok())
                })
            }
            "LREM" => {
                let [key, count, value] = args else { return Err(arity(cmd)) };
                let count = int_arg(count)?;
                self.with_list(key, Missing::Zero, |list| Ok(RespValue::integer(list_remove(list, count, value))))
            }
            "LRANGE" => {
                let [key, start, stop] = args else { return Err(arity(cmd)) };
                let (start, stop) = (int_arg(start)?, int_arg(stop)?);
                self.with_list(key, Missing::Empty, |list| {
                    let items = match normalize_range(start, stop, list.len()) {
                        Some((from, to)) => list
                            .range(from..=to)
                            .cloned()
                            .map(RespValue::bulk_string)
                            .collect(),
                        None => Vec::new(),
                    };
                    Ok(RespValue::array(items))
                })
            }

            // Hashes
            "HSET" => {
                let [key, pairs @ ..] = args else { return Err(arity(cmd)) };
                if pairs.is_empty() || pairs.len() % 2 != 0 {
                    return Err(arity(cmd));
                }
                self.with_hash(key, Missing::Create, |hash| {
                    let added = pairs
                        .chunks(2)
                        .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                        .count();
                    Ok(RespValue::integer(added as i64))
                })
            }
            "HGET" => {
                let [key, field] = args else { return Err(arity(cmd)) };
                self.with_hash(key, Missing::Null, |hash| {
                    Ok(hash
                        .get(field)
                        .cloned()
                        .map(RespValue::bulk_string)
                        .unwrap_or(RespValue::Null))
                })
            }
            "HDEL" => {
                let [key, fields @ ..] = args else { return Err(arity(cmd)) };
                if fields.is_empty() {
                    return Err(arity(cmd));
                }
                self.with_hash(key, Missing::Zero, |hash| {
                    let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
                    Ok(RespValue::integer(removed as i64))
                })
            }
            "HLEN" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_hash(key, Missing::Zero, |hash| Ok(RespValue::integer(hash.len() as i64)))
            }
            "HEXISTS" => {
                let [key, field] = args else { return Err(arity(cmd)) };
                self.with_hash(key, Missing::Zero, |hash| {
                    Ok(RespValue::integer(hash.contains_key(field) as i64))
                })
            }
            "HGETALL" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_hash(key, Missing::Empty, |hash| {
                    Ok(RespValue::array(
                        hash.iter()
                            .flat_map(|(f, v)| {
                                [RespValue::bulk_string(f.clone()), RespValue::bulk_string(v.clone())]
                            })
                            .collect(),
                    ))
                })
            }

            // Sets
            "SADD" | "SREM" => {
                let [key, members @ ..] = args else { return Err(arity(cmd)) };
                if members.is_empty() {
                    return Err(arity(cmd));
                }
                self.with_set(key, if cmd == "SADD" { Missing::Create } else { Missing::Zero }, |set| {
                    let changed = members
                        .iter()
                        .filter(|m| {
                            if cmd == "SADD" {
                                set.insert((*m).clone())
                            } else {
                                set.remove(*m)
                            }
                        })
                        .count();
                    Ok(RespValue::integer(changed as i64))
                })
            }
            "SISMEMBER" => {
                let [key, member] = args else { return Err(arity(cmd)) };
                self.with_set(key, Missing::Zero, |set| Ok(RespValue::integer(set.contains(member) as i64)))
            }
            "SCARD" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_set(key, Missing::Zero, |set| Ok(RespValue::integer(set.len() as i64)))
            }
            "SMEMBERS" => {
                let [key] = args else { return Err(arity(cmd)) };
                self.with_set(key, Missing::Empty, |set| {
                    Ok(RespValue::array(
                        set.iter().cloned().map(RespValue::bulk_string).collect(),
                    ))
                })
            }

            _ => Err(format!("ERR unknown command '{}'", cmd)),
        }
    }

    fn read<R>(&self, key: &Bytes, f: impl FnOnce(Option<&Value>) -> R) -> R {
        let buckets = self.buckets.read();
        f(buckets[bucket_index(key)].get(key))
    }

    /// Runs `f` on the slot for `key`. Setting the slot to `None` or to an
    /// empty collection removes the key.
    fn write(&self, key: &Bytes, f: impl FnOnce(&mut Option<Value>) -> Outcome) -> Outcome {
        let mut buckets = self.buckets.write();
        let bucket = &mut buckets[bucket_index(key)];
        let mut slot = bucket.remove(key);
        let outcome = f(&mut slot);
        if let Some(value) = slot {
            if !value.is_empty_collection() {
                bucket.insert(key.clone(), value);
            }
        }
        outcome
    }

    /// Runs `f` on the list at `key`. What happens when the key is absent
    /// is up to `missing`.
    fn with_list(
        &self,
        key: &Bytes,
        missing: Missing,
        f: impl FnOnce(&mut VecDeque<Bytes>) -> Outcome,
    ) -> Outcome {
        self.write(key, |slot| match slot {
            Some(Value::List(list)) => f(list),
            Some(_) => Err(WRONGTYPE.to_string()),
            None if matches!(missing, Missing::Create) => {
                let mut list = VecDeque::new();
                let outcome = f(&mut list);
                *slot = Some(Value::List(list));
                outcome
            }
            None => missing.reply(),
        })
    }

    fn with_hash(
        &self,
        key: &Bytes,
        missing: Missing,
        f: impl FnOnce(&mut HashMap<Bytes, Bytes>) -> Outcome,
    ) -> Outcome {
        self.write(key, |slot| match slot {
            Some(Value::Hash(hash)) => f(hash),
            Some(_) => Err(WRONGTYPE.to_string()),
            None if matches!(missing, Missing::Create) => {
                let mut hash = HashMap::new();
                let outcome = f(&mut hash);
                *slot = Some(Value::Hash(hash));
                outcome
            }
            None => missing.reply(),
        })
    }

    fn with_set(
        &self,
        key: &Bytes,
        missing: Missing,
        f: impl FnOnce(&mut HashSet<Bytes>) -> Outcome,
    ) -> Outcome {
        self.write(key, |slot| match slot {
            Some(Value::Set(set)) => f(set),
            Some(_) => Err(WRONGTYPE.to_string()),
            None if matches!(missing, Missing::Create) => {
                let mut set = HashSet::new();
                let outcome = f(&mut set);
                *slot = Some(Value::Set(set));
                outcome
            }
            None => missing.reply(),
        })
    }

    /// RENAME / RENAMENX
    fn rename(&self, key: &Bytes, new_key: &Bytes, overwrite: bool) -> Outcome {
        let mut buckets = self.buckets.write();
        if !buckets[bucket_index(key)].contains_key(key) {
            return Err("ERR no such key".to_string());
        }
        if key == new_key {
            return Ok(if overwrite { RespValue::ok() } else { RespValue::integer(0) });
        }

        if !overwrite && buckets[bucket_index(new_key)].contains_key(new_key) {
            return Ok(RespValue::integer(0));
        }

        if let Some(value) = buckets[bucket_index(key)].remove(key) {
            buckets[bucket_index(new_key)].insert(new_key.clone(), value);
        }
        Ok(if overwrite { RespValue::ok() } else { RespValue::integer(1) })
    }

    /// SCAN cursor [MATCH pattern] [COUNT count]
    fn scan(&self, args: &[Bytes]) -> Outcome {
        let [cursor, options @ ..] = args else { return Err(arity("SCAN")) };
        let cursor = std::str::from_utf8(cursor)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| "ERR invalid cursor".to_string())?;

        let mut pattern: Option<&Bytes> = None;
        let mut count = DEFAULT_SCAN_COUNT;
        let mut opts = options.iter();
        while let Some(opt) = opts.next() {
            let value = opts.next().ok_or_else(|| "ERR syntax error".to_string())?;
            if opt.eq_ignore_ascii_case(b"MATCH") {
                pattern = Some(value);
            } else if opt.eq_ignore_ascii_case(b"COUNT") {
                count = usize::try_from(int_arg(value)?)
                    .ok()
                    .filter(|c| *c > 0)
                    .ok_or_else(|| "ERR syntax error".to_string())?;
            } else {
                return Err("ERR syntax error".to_string());
            }
        }

        let buckets = self.buckets.read();
        let mut index = usize::try_from(cursor).unwrap_or(NUM_BUCKETS);
        let mut examined = 0;
        let mut keys = Vec::new();

        while index < NUM_BUCKETS {
            for key in buckets[index].keys() {
                examined += 1;
                if pattern.map_or(true, |p| glob_match(p, key)) {
                    keys.push(RespValue::bulk_string(key.clone()));
                }
            }
            index += 1;
            if examined >= count {
                break;
            }
        }

        let next = if index >= NUM_BUCKETS { 0 } else { index };
        Ok(RespValue::array(vec![
            RespValue::bulk_string(next.to_string()),
            RespValue::array(keys),
        ]))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_command(&self, command: &Command, _write: bool) -> Result<RespValue> {
        into_result(self.dispatch(command.name(), command.arguments()))
    }
}

/// Determines which bucket a key belongs to.
#[inline]
fn bucket_index(key: &[u8]) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % NUM_BUCKETS
}

fn arity(cmd: &str) -> String {
    format!("ERR wrong number of arguments for '{}' command", cmd)
}

fn int_arg(arg: &Bytes) -> std::result::Result<i64, String> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "ERR value is not an integer or out of range".to_string())
}

/// Resolves an inclusive `[start, end]` range with negative indexes
/// counting from the end. `None` when the range is empty.
fn normalize_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if start > end || start >= len || end < 0 {
        return None;
    }
    Some((start as usize, end as usize))
}

fn list_position(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    usize::try_from(resolved).ok().filter(|i| *i < len)
}

/// LREM semantics: `count > 0` from the head, `< 0` from the tail, `0` all.
fn list_remove(list: &mut VecDeque<Bytes>, count: i64, value: &Bytes) -> i64 {
    let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
    let mut removed = 0;

    if count >= 0 {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    } else {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if &list[i] == value {
                list.remove(i);
                removed += 1;
            }
        }
    }
    removed as i64
}

/// Glob matching for KEYS and SCAN MATCH.
///
/// Supported patterns:
/// - `*` matches any run of bytes
/// - `?` matches exactly one byte
/// - `[ae]`, `[a-z]`, `[^e]` match one byte from (or not from) a class
/// - `\x` matches `x` literally
///
/// Runs in O(pattern × text): on a mismatch the matcher only backtracks to
/// the most recent `*`.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index just past the last `*`, and the text index it resumes from
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if pattern.get(p) == Some(&b'*') {
            p += 1;
            star = Some((p, t));
            continue;
        }

        if let Some((true, width)) = match_token(&pattern[p..], text[t]) {
            p += width;
            t += 1;
            continue;
        }

        match star {
            Some((after_star, resume)) => {
                p = after_star;
                t = resume + 1;
                star = Some((after_star, resume + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

/// Matches the single-byte token at the start of `pattern` against `c`.
/// Returns the outcome and the token's width, or `None` when there is no
/// token (end of pattern, unterminated class).
fn match_token(pattern: &[u8], c: u8) -> Option<(bool, usize)> {
    match *pattern.first()? {
        b'?' => Some((true, 1)),
        b'[' => {
            let class = &pattern[1..];
            let mut i = 0;
            let negate = class.first() == Some(&b'^');
            if negate {
                i += 1;
            }

            let mut matched = false;
            while i < class.len() && class[i] != b']' {
                if i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']' {
                    let (lo, hi) = (class[i].min(class[i + 2]), class[i].max(class[i + 2]));
                    matched |= (lo..=hi).contains(&c);
                    i += 3;
                } else {
                    matched |= class[i] == c;
                    i += 1;
                }
            }

            // Unterminated class
            if i >= class.len() {
                return None;
            }
            Some((matched != negate, i + 2))
        }
        b'\\' if pattern.len() > 1 => Some((pattern[1] == c, 2)),
        literal => Some((literal == c, 1)),
    }
}
