//! Typed collection handles.
//!
//! A handle is a view bound to one key. It holds no data of its own; each
//! method is a single executor call, so every operation is timed on the
//! client's counter and flagged as a read or a write.
//!
//! | Handle    | Server type | Obtained with                 |
//! |-----------|-------------|-------------------------------|
//! | `KvList`  | list        | `FullClient::get_list(key)`   |
//! | `KvHash`  | hash        | `FullClient::get_hash(key)`   |
//! | `KvQueue` | list (FIFO) | `FullClient::get_queue(key)`  |
//! | `KvSet`   | set         | `FullClient::get_set(key)`    |
//!
//! Element types implement [`ToArg`](crate::ToArg) to be sent and
//! [`FromReply`](crate::FromReply) to be read back.

pub mod hash;
pub mod list;
pub mod queue;
pub mod set;

pub use hash::KvHash;
pub use list::KvList;
pub use queue::KvQueue;
pub use set::KvSet;
