use crate::command::{Command, ToArg};
use crate::error::{ClientError, Result};
use crate::executor::InstrumentedExecutor;
use crate::reply::FromReply;
use crate::transport::Transport;
use std::marker::PhantomData;

/// A FIFO queue on top of a list: producers add at the tail, consumers
/// take from the head.
pub struct KvQueue<'a, T, V> {
    exec: &'a InstrumentedExecutor<T>,
    key: String,
    _elem: PhantomData<fn() -> V>,
}

impl<'a, T: Transport, V: ToArg + FromReply> KvQueue<'a, T, V> {
    pub(crate) fn new(exec: &'a InstrumentedExecutor<T>, key: String) -> Self {
        Self {
            exec,
            key,
            _elem: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Enqueues `values` in order and returns the queue length.
    pub async fn add(&self, values: impl IntoIterator<Item = V>) -> Result<usize> {
        let command = Command::new("RPUSH").arg(&self.key).args(values);
        if command.arguments().len() < 2 {
            return Err(ClientError::InvalidArgument(
                "nothing to add to queue".to_string(),
            ));
        }
        self.exec.execute(command, true).await
    }

    /// Dequeues one element, or `None` if the queue is empty.
    pub async fn take(&self) -> Result<Option<V>> {
        self.exec.execute(Command::new("LPOP").arg(&self.key), true).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.exec.execute(Command::new("LLEN").arg(&self.key), false).await
    }
}
