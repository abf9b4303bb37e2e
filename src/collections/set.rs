use crate::command::{Command, ToArg};
use crate::error::Result;
use crate::executor::InstrumentedExecutor;
use crate::reply::FromReply;
use crate::transport::Transport;
use std::marker::PhantomData;

/// An unordered set stored under one key.
pub struct KvSet<'a, T, V> {
    exec: &'a InstrumentedExecutor<T>,
    key: String,
    _elem: PhantomData<fn() -> V>,
}

impl<'a, T: Transport, V: ToArg + FromReply> KvSet<'a, T, V> {
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

    /// Returns `true` if `member` was not already present.
    pub async fn add(&self, member: V) -> Result<bool> {
        self.exec
            .execute(Command::new("SADD").arg(&self.key).arg(member), true)
            .await
    }

    pub async fn remove(&self, member: V) -> Result<bool> {
        self.exec
            .execute(Command::new("SREM").arg(&self.key).arg(member), true)
            .await
    }

    pub async fn contains(&self, member: V) -> Result<bool> {
        self.exec
            .execute(Command::new("SISMEMBER").arg(&self.key).arg(member), false)
            .await
    }

    pub async fn len(&self) -> Result<usize> {
        self.exec.execute(Command::new("SCARD").arg(&self.key), false).await
    }

    pub async fn members(&self) -> Result<Vec<V>> {
        self.exec
            .execute(Command::new("SMEMBERS").arg(&self.key), false)
            .await
    }
}
