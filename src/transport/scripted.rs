//! Transport that answers from a prepared list of replies.

use crate::command::Command;
use crate::error::{ClientError, Result};
use crate::protocol::RespValue;
use crate::transport::{into_result, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One command as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sent {
    pub parts: Vec<String>,
    pub write: bool,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<RespValue>>>,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Result<RespValue>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: RespValue) -> Self {
        Self::new([Ok(reply)])
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue> {
        let parts = command
            .to_parts()
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect();
        self.sent.lock().push(Sent { parts, write });

        match self.replies.lock().pop_front() {
            Some(reply) => reply.and_then(into_result),
            None => Err(ClientError::ConnectionClosed),
        }
    }
}
