//! Benchmarks for message encoding and decoding.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pagemesh_core::Message;
use serde_json::{Map, Value};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_encode");

    for size in [256, 4 * 1024, 64 * 1024] {
        let mut header = Map::new();
        header.insert("kind".to_string(), Value::from("chunk"));
        let msg = Message {
            status: pagemesh_core::Status::Ok,
            header,
            payload: vec![0xA5u8; size],
        };
        group.bench_function(format!("{size}_bytes"), |b| {
            b.iter(|| black_box(&msg).encode().unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_decode");

    for size in [256, 4 * 1024, 64 * 1024] {
        let encoded = Message::ok(vec![0xA5u8; size]).encode().unwrap();
        group.bench_function(format!("{size}_bytes"), |b| {
            b.iter(|| Message::decode(black_box(&encoded)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
