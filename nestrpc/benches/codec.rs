//! Codec and round-trip benchmarks for nestrpc
//!
//! Measures:
//! - Encoding and decoding of call and result packets
//! - Reassembly of a packet delivered in small chunks
//! - Call latency over a loopback connection

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nestrpc::rpc::FunctionRegistry;
use nestrpc::serialization::{
    Call, CallResult, CorrelationId, Packet, StreamReassembler, Value, codec,
};
use nestrpc::transport::{Connection, ConnectionConfig, Listener};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn call_packet(size: usize) -> Packet {
    Packet::new(
        CorrelationId::new(1, 1),
        Call::new("store")
            .arg(Value::bytes(vec![7u8; size]))
            .named("key", "bench"),
    )
}

fn result_packet(size: usize) -> Packet {
    let items: Vec<Value> = (0..size as i64).map(Value::Int).collect();
    Packet::new(CorrelationId::new(1, 2), CallResult::returning(Value::List(items)))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode");
    for size in [16usize, 1024, 16 * 1024] {
        let packet = call_packet(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("call", size), &packet, |b, packet| {
            b.iter(|| codec::encode(black_box(packet)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_decode");
    for size in [16usize, 256, 4096] {
        let bytes = codec::encode(&result_packet(size)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("result", size), &bytes, |b, bytes| {
            b.iter(|| codec::decode(black_box(bytes)).unwrap());
        });
    }
    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let bytes = codec::encode(&call_packet(64 * 1024)).unwrap();
    let mut group = c.benchmark_group("reassembly");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("1k_chunks", |b| {
        b.iter(|| {
            let mut reassembler = StreamReassembler::new();
            let mut found = None;
            for chunk in bytes.chunks(1024) {
                if let Some(packet) = reassembler.add_chunk(chunk).unwrap() {
                    found = Some(packet);
                }
            }
            black_box(found.unwrap())
        });
    });
    group.finish();
}

fn bench_loopback_call(c: &mut Criterion) {
    let functions = Arc::new(FunctionRegistry::new());
    functions.register("echo", |_ctx, args| args.positional::<Value>(0));
    let listener = Listener::bind("127.0.0.1:0", functions, ConnectionConfig::accepted()).unwrap();
    let client = Connection::initiator(
        listener.local_addr().to_string(),
        Arc::new(FunctionRegistry::new()),
        ConnectionConfig::initiator(),
    );
    assert!(client.start(true, Some(Duration::from_secs(5))));
    let proxy = client.proxy();

    let mut group = c.benchmark_group("loopback");
    group.throughput(Throughput::Elements(1));
    group.bench_function("echo_call", |b| {
        b.iter(|| {
            proxy
                .call("echo", vec![Value::from(42)], BTreeMap::new(), Some(Duration::from_secs(5)))
                .unwrap()
        });
    });
    group.finish();

    client.stop();
    listener.stop();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_reassembly,
    bench_loopback_call
);
criterion_main!(benches);
