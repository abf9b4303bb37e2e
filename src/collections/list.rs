use crate::command::{Command, ToArg};
use crate::error::Result;
use crate::executor::InstrumentedExecutor;
use crate::reply::FromReply;
use crate::transport::Transport;
use std::marker::PhantomData;

/// A list stored under one key.
pub struct KvList<'a, T, V> {
    exec: &'a InstrumentedExecutor<T>,
    key: String,
    _elem: PhantomData<fn() -> V>,
}

impl<'a, T: Transport, V: ToArg + FromReply> KvList<'a, T, V> {
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

    pub async fn len(&self) -> Result<usize> {
        self.exec.execute(Command::new("LLEN").arg(&self.key), false).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Appends to the tail and returns the new length.
    pub async fn push(&self, value: V) -> Result<usize> {
        self.exec
            .execute(Command::new("RPUSH").arg(&self.key).arg(value), true)
            .await
    }

    /// Element at `index`; negative indexes count from the tail.
    pub async fn get(&self, index: i64) -> Result<Option<V>> {
        self.exec
            .execute(Command::new("LINDEX").arg(&self.key).arg(index), false)
            .await
    }

    /// Replaces the element at `index`. Fails with a server error when the
    /// index is out of range.
    pub async fn set(&self, index: i64, value: V) -> Result<()> {
        let _: bool = self
            .exec
            .execute(Command::new("LSET").arg(&self.key).arg(index).arg(value), true)
            .await?;
        Ok(())
    }

    /// Removes the first occurrence of `value`. Returns whether one was
    /// found.
    pub async fn remove(&self, value: V) -> Result<bool> {
        self.exec
            .execute(Command::new("LREM").arg(&self.key).arg(1).arg(value), true)
            .await
    }

    /// Elements from `start` to `stop`, inclusive.
    pub async fn range(&self, start: i64, stop: i64) -> Result<Vec<V>> {
        self.exec
            .execute(Command::new("LRANGE").arg(&self.key).arg(start).arg(stop), false)
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        let _: i64 = self.exec.execute(Command::new("DEL").arg(&self.key), true).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ClientError;
    use crate::transport::MemoryTransport;
    use crate::FullClient;

    #[tokio::test]
    async fn test_list_operations() {
        let client = FullClient::with_transport(MemoryTransport::new());
        let list = client.get_list::<String>("tasks");

        assert!(list.is_empty().await.unwrap());
        assert_eq!(list.push("a".to_string()).await.unwrap(), 1);
        assert_eq!(list.push("b".to_string()).await.unwrap(), 2);
        assert_eq!(list.push("c".to_string()).await.unwrap(), 3);

        assert_eq!(list.get(0).await.unwrap().as_deref(), Some("a"));
        assert_eq!(list.get(-1).await.unwrap().as_deref(), Some("c"));
        assert_eq!(list.get(10).await.unwrap(), None);

        list.set(1, "B".to_string()).await.unwrap();
        assert_eq!(list.range(0, -1).await.unwrap(), vec!["a", "B", "c"]);

        assert!(list.remove("a".to_string()).await.unwrap());
        assert!(!list.remove("zzz".to_string()).await.unwrap());
        assert_eq!(list.len().await.unwrap(), 2);

        list.clear().await.unwrap();
        assert_eq!(list.len().await.unwrap(), 0);
        assert!(list.range(0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_set_out_of_range() {
        let client = FullClient::with_transport(MemoryTransport::new());
        let list = client.get_list::<i64>("nums");
        list.push(1).await.unwrap();

        let err = list.set(5, 2).await.unwrap_err();
        assert!(matches!(err, ClientError::Server(ref m) if m.contains("out of range")));
        assert_eq!(list.get(0).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_list_ops_are_flagged() {
        let client = FullClient::with_transport(MemoryTransport::new());
        let list = client.get_list::<String>("l");
        list.push("x".to_string()).await.unwrap();
        list.len().await.unwrap();
        list.range(0, -1).await.unwrap();

        let perf = client.perf();
        assert_eq!(perf.writes, 1);
        assert_eq!(perf.reads, 2);
    }
}
