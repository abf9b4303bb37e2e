//! Instrumented command execution.
//!
//! Every remote call the client makes goes through
//! [`InstrumentedExecutor::execute`]. The executor brackets the call with
//! the performance counter, hands the command to the wrapped transport and
//! coerces the reply into the caller's type.
//!
//! ```text
//!   execute(cmd, write)
//!        │
//!        ├── counter.start_count(write)
//!        ├── inner.send_command(cmd, write)
//!        ├── counter.stop_count(token, ok)
//!        └── R::from_reply(reply)
//! ```
//!
//! Exactly one sample is recorded per call, success or failure. Errors
//! from the transport come back unchanged; the executor never retries.

use crate::command::Command;
use crate::counter::PerfCounter;
use crate::error::Result;
use crate::protocol::RespValue;
use crate::reply::FromReply;
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// Wraps a [`Transport`] and times every command sent through it.
pub struct InstrumentedExecutor<T> {
    inner: T,
    counter: Arc<PerfCounter>,
}

impl<T: Transport> InstrumentedExecutor<T> {
    pub fn new(inner: T) -> Self {
        Self::with_counter(inner, Arc::new(PerfCounter::new()))
    }

    /// Uses an existing counter, so several executors can report into one.
    pub fn with_counter(inner: T, counter: Arc<PerfCounter>) -> Self {
        Self { inner, counter }
    }

    pub fn counter(&self) -> &Arc<PerfCounter> {
        &self.counter
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Runs `command` and converts the reply to `R`.
    ///
    /// `write` marks commands that change data; it is recorded on the
    /// counter and passed to the transport, which may use it to decide
    /// whether a failed command can be replayed.
    pub async fn execute<R: FromReply>(&self, command: Command, write: bool) -> Result<R> {
        let reply = self.send_command(&command, write).await?;
        R::from_reply(reply)
    }
}

#[async_trait]
impl<T: Transport> Transport for InstrumentedExecutor<T> {
    async fn send_command(&self, command: &Command, write: bool) -> Result<RespValue> {
        let token = self.counter.start_count(write);
        let result = self.inner.send_command(command, write).await;
        let elapsed = self.counter.stop_count(token, result.is_ok());

        match &result {
            Ok(_) => trace!(
                command = command.name(),
                write,
                elapsed_us = elapsed.as_micros() as u64,
                "Command completed"
            ),
            Err(e) => debug!(
                command = %command,
                write,
                elapsed_us = elapsed.as_micros() as u64,
                error = %e,
                "Command failed"
            ),
        }
        result
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for InstrumentedExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedExecutor")
            .field("inner", &self.inner)
            .field("perf", &self.counter.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::transport::scripted::ScriptedTransport;
    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn test_success_records_one_sample() {
        let exec = InstrumentedExecutor::new(MemoryTransport::new());

        let len: usize = exec
            .execute(Command::new("APPEND").arg("k").arg("abc"), true)
            .await
            .unwrap();
        assert_eq!(len, 3);

        let snap = exec.counter().snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.reads, 0);
        assert_eq!(snap.failures, 0);
    }

    #[tokio::test]
    async fn test_failure_records_one_sample_and_propagates() {
        let exec = InstrumentedExecutor::new(ScriptedTransport::new([Err(ClientError::Timeout(
            std::time::Duration::from_millis(5),
        ))]));

        let err = exec
            .execute::<usize>(Command::new("STRLEN").arg("k"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));

        let snap = exec.counter().snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.failures, 1);
    }

    #[tokio::test]
    async fn test_server_error_is_a_failure() {
        let exec = InstrumentedExecutor::new(MemoryTransport::new());

        let err = exec
            .execute::<bool>(Command::new("RENAME").arg("missing").arg("x"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server(ref m) if m == "ERR no such key"));
        assert_eq!(exec.counter().snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_coercion_error_after_successful_send() {
        let exec = InstrumentedExecutor::new(ScriptedTransport::replying(RespValue::array(vec![])));

        let err = exec
            .execute::<i64>(Command::new("STRLEN").arg("k"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedReply { .. }));

        // The round-trip itself succeeded
        let snap = exec.counter().snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.failures, 0);
    }

    #[tokio::test]
    async fn test_decorators_nest() {
        let counter = Arc::new(PerfCounter::new());
        let inner = InstrumentedExecutor::with_counter(MemoryTransport::new(), Arc::clone(&counter));
        let outer = InstrumentedExecutor::new(inner);

        let _: String = outer.execute(Command::new("PING"), false).await.unwrap();
        let err = outer
            .execute::<RespValue>(Command::new("NOPE"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server(_)));

        for snap in [counter.snapshot(), outer.counter().snapshot()] {
            assert_eq!(snap.total, 2);
            assert_eq!(snap.failures, 1);
        }
    }

    /// Never answers.
    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn send_command(&self, _command: &Command, _write: bool) -> Result<RespValue> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_cancelled_call_counts_as_failure() {
        let exec = InstrumentedExecutor::new(Stalled);
        {
            let mut call = tokio_test::task::spawn(
                exec.execute::<RespValue>(Command::new("GET").arg("k"), false),
            );
            tokio_test::assert_pending!(call.poll());
            assert_eq!(exec.counter().snapshot().total, 0);
        }

        let snap = exec.counter().snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.failures, 1);
    }

    #[tokio::test]
    async fn test_write_flag_reaches_transport() {
        let exec = InstrumentedExecutor::new(ScriptedTransport::new([
            Ok(RespValue::Integer(1)),
            Ok(RespValue::Integer(1)),
        ]));

        let _: i64 = exec.execute(Command::new("STRLEN").arg("k"), false).await.unwrap();
        let _: i64 = exec.execute(Command::new("DEL").arg("k"), true).await.unwrap();

        let flags: Vec<bool> = exec.inner().sent().iter().map(|s| s.write).collect();
        assert_eq!(flags, vec![false, true]);
    }
}
