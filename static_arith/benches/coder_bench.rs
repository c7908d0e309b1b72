// static_arith/benches/coder_bench.rs

use criterion::{criterion_group, criterion_main, Criterion};
use static_arith::{arithmetic_decode, arithmetic_encode, Model};

fn bench_static_coder(c: &mut Criterion) {
    let mut group = c.benchmark_group("static_coder");
    let message = b"the quick brown fox jumps over the lazy dog ".repeat(8);
    let model = Model::from_text(&message).unwrap();
    let precision = model.required_precision(message.len());

    group.bench_function("encode", |b| {
        b.iter(|| arithmetic_encode(&message, &model, precision).unwrap())
    });

    let value = arithmetic_encode(&message, &model, precision).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| arithmetic_decode(&value, message.len(), &model, precision).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_static_coder);
criterion_main!(benches);
