//! Microbenchmarks for the hot table operations (spec §3: "Name equality
//! and prefix tests are the hot operations and must be constant-time in
//! component count").

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Instant;

use rust_udcn_common::ndn::Name;
use rust_udcn_fw::face::FaceId;
use rust_udcn_fw::tables::{Fib, Pit};

fn bench_fib_longest_prefix_match(c: &mut Criterion) {
    let mut fib = Fib::new();
    for i in 0..1000u64 {
        fib.insert_nexthop(&Name::from_string(&format!("/net/{i}")), FaceId(i % 16), (i % 32) as u32);
    }
    let query = Name::from_string("/net/500/sub/path/deeper");

    c.bench_function("fib_longest_prefix_match", |b| {
        b.iter(|| black_box(fib.longest_prefix_match(black_box(&query))))
    });
}

fn bench_pit_insert(c: &mut Criterion) {
    c.bench_function("pit_find_or_insert", |b| {
        b.iter_batched(
            Pit::new,
            |mut pit| {
                let now = Instant::now();
                for i in 0..256u32 {
                    let name = Name::from_string(&format!("/bench/{i}"));
                    black_box(pit.find_or_insert(&name, i, now));
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_fib_longest_prefix_match, bench_pit_insert);
criterion_main!(benches);
