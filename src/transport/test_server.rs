//! Throwaway RESP server for connection and pool tests.

use crate::protocol::{ReplyDecoder, RespValue};
use bytes::BytesMut;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the server does with one received command.
pub(crate) enum Behavior {
    Reply(RespValue),
    /// Drop the connection without answering
    Close,
    /// Never answer
    Stall,
}

pub(crate) struct TestServer {
    pub addr: SocketAddr,
    log: Arc<Mutex<Vec<Vec<String>>>>,
    accepted: Arc<AtomicUsize>,
}

impl TestServer {
    /// Every command received so far, across all connections.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.log.lock().clone()
    }

    /// Connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

pub(crate) async fn spawn_server<F>(handler: F) -> TestServer
where
    F: Fn(&[String]) -> Behavior + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let accepted = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(handler);

    let server_log = Arc::clone(&log);
    let server_accepted = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            server_accepted.fetch_add(1, Ordering::SeqCst);
            let handler = Arc::clone(&handler);
            let log = Arc::clone(&server_log);
            tokio::spawn(serve(stream, handler, log));
        }
    });

    TestServer { addr, log, accepted }
}

async fn serve<F>(mut stream: TcpStream, handler: Arc<F>, log: Arc<Mutex<Vec<Vec<String>>>>)
where
    F: Fn(&[String]) -> Behavior + Send + Sync + 'static,
{
    let decoder = ReplyDecoder::new();
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        while let Ok(Some(frame)) = decoder.decode(&mut buf) {
            let args: Vec<String> = frame
                .into_array()
                .unwrap_or_default()
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            log.lock().push(args.clone());

            match (handler.as_ref())(&args) {
                Behavior::Reply(reply) => {
                    if stream.write_all(&reply.serialize()).await.is_err() {
                        return;
                    }
                }
                Behavior::Close => return,
                Behavior::Stall => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    return;
                }
            }
        }

        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
