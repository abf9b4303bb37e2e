use crate::command::{Command, ToArg};
use crate::error::{ClientError, Result};
use crate::executor::InstrumentedExecutor;
use crate::protocol::RespValue;
use crate::reply::FromReply;
use crate::transport::Transport;
use std::marker::PhantomData;

/// A hash stored under one key, with string fields and `V` values.
pub struct KvHash<'a, T, V> {
    exec: &'a InstrumentedExecutor<T>,
    key: String,
    _elem: PhantomData<fn() -> V>,
}

impl<'a, T: Transport, V: ToArg + FromReply> KvHash<'a, T, V> {
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

    /// Sets `field`. Returns `true` if the field is new.
    pub async fn insert(&self, field: &str, value: V) -> Result<bool> {
        self.exec
            .execute(Command::new("HSET").arg(&self.key).arg(field).arg(value), true)
            .await
    }

    pub async fn get(&self, field: &str) -> Result<Option<V>> {
        self.exec
            .execute(Command::new("HGET").arg(&self.key).arg(field), false)
            .await
    }

    pub async fn remove(&self, field: &str) -> Result<bool> {
        self.exec
            .execute(Command::new("HDEL").arg(&self.key).arg(field), true)
            .await
    }

    pub async fn len(&self) -> Result<usize> {
        self.exec.execute(Command::new("HLEN").arg(&self.key), false).await
    }

    pub async fn contains_key(&self, field: &str) -> Result<bool> {
        self.exec
            .execute(Command::new("HEXISTS").arg(&self.key).arg(field), false)
            .await
    }

    /// Every field and value, in server order.
    pub async fn entries(&self) -> Result<Vec<(String, V)>> {
        let flat: Vec<RespValue> = self
            .exec
            .execute(Command::new("HGETALL").arg(&self.key), false)
            .await?;
        if flat.len() % 2 != 0 {
            return Err(ClientError::UnexpectedReply {
                expected: "field/value pairs",
                actual: "odd-length array",
            });
        }

        let mut entries = Vec::with_capacity(flat.len() / 2);
        let mut items = flat.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            entries.push((String::from_reply(field)?, V::from_reply(value)?));
        }
        Ok(entries)
    }
}
