//! Throughput Benchmark for the FlashKV client
//!
//! Measures reply decoding, the performance counter, and full executor
//! round-trips over the in-process transport.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashkv_client::scan::decode_scan_reply;
use flashkv_client::{FullClient, MemoryTransport, PerfCounter, ReplyDecoder, RespValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn scan_reply(keys: usize) -> RespValue {
    RespValue::array(vec![
        RespValue::bulk_string("1234"),
        RespValue::array(
            (0..keys)
                .map(|i| RespValue::bulk_string(format!("user:{}", i)))
                .collect(),
        ),
    ])
}

/// Benchmark reply decoding
fn bench_decode(c: &mut Criterion) {
    let decoder = ReplyDecoder::new();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("integer", |b| {
        let wire = RespValue::Integer(123_456).serialize();
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            black_box(decoder.decode(&mut buf).unwrap());
        });
    });

    group.bench_function("bulk_64kb", |b| {
        let wire = RespValue::bulk_string("x".repeat(64 * 1024)).serialize();
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            black_box(decoder.decode(&mut buf).unwrap());
        });
    });

    group.bench_function("scan_reply_1000_keys", |b| {
        let wire = scan_reply(1_000).serialize();
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            let reply = decoder.decode(&mut buf).unwrap().unwrap();
            black_box(decode_scan_reply(reply).unwrap());
        });
    });

    group.finish();
}

/// Benchmark the performance counter
fn bench_counter(c: &mut Criterion) {
    let counter = PerfCounter::new();

    let mut group = c.benchmark_group("counter");
    group.throughput(Throughput::Elements(1));

    group.bench_function("start_stop", |b| {
        b.iter(|| {
            let token = counter.start_count(false);
            black_box(counter.stop_count(token, true));
        });
    });

    group.bench_function("4_threads_start_stop", |b| {
        use std::thread;

        b.iter(|| {
            let counter = Arc::new(PerfCounter::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let counter = Arc::clone(&counter);
                    thread::spawn(move || {
                        for _ in 0..10_000 {
                            let token = counter.start_count(t % 2 == 0);
                            counter.stop_count(token, true);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(counter.snapshot());
        });
    });

    group.finish();
}

/// Benchmark executor round-trips over the memory transport
fn bench_executor(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let client = FullClient::with_transport(MemoryTransport::new());

    rt.block_on(async {
        for i in 0..1_000 {
            client.set(format!("user:{}", i), "user_data").await.unwrap();
            client.set(format!("session:{}", i), "session_data").await.unwrap();
        }
    });

    let mut group = c.benchmark_group("executor");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("append", |b| {
        let value = Bytes::from("x".repeat(16));
        b.iter(|| {
            rt.block_on(async {
                black_box(client.append("bench:append", value.clone()).await.unwrap());
            });
        });
        rt.block_on(client.remove("bench:append")).unwrap();
    });

    group.bench_function("get_range", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(client.get_range("user:1", 0, 3).await.unwrap());
            });
        });
    });

    group.bench_function("keys_pattern", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(client.search("user:*").await.unwrap());
            });
        });
    });

    group.bench_function("scan_full_pass", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut cursor = 0;
                let mut total = 0;
                loop {
                    total += client.scan("user:*", 100, &mut cursor).await.unwrap().len();
                    if cursor == 0 {
                        break;
                    }
                }
                black_box(total);
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_counter, bench_executor);

criterion_main!(benches);
