//! Benchmarks for query construction and serialization
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use spanql::prelude::*;
use spanql::query::Serial;

fn create_conditions(stream: &Stream, count: usize) -> Vec<Condition> {
    (0..count)
        .map(|i| stream.field(format!("f{}", i)).gt(i as i64).unwrap())
        .collect()
}

fn bench_combinators(c: &mut Criterion) {
    let mut group = c.benchmark_group("combinators");
    let stream = Stream::new("bench");

    for size in [10, 100, 1000] {
        let conds = create_conditions(&stream, size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("and_fold_{}", size), |b| {
            let node = conds
                .iter()
                .cloned()
                .map(Node::from)
                .reduce(|acc, next| acc & next)
                .unwrap();
            b.iter(|| black_box(&node).to_ast().unwrap())
        });

        group.bench_function(format!("serial_{}", size), |b| {
            let serial = Serial::new(conds.iter().cloned());
            b.iter(|| black_box(&serial).to_ast().unwrap())
        });
    }

    group.finish();
}

fn bench_constraints(c: &mut Criterion) {
    let mut group = c.benchmark_group("constraints");
    let stream = Stream::new("bench");

    group.bench_function("nested_wrappers", |b| {
        b.iter(|| {
            stream
                .field("x")
                .equals(black_box(true))
                .unwrap()
                .for_at_least(Duration::minutes(1))
                .unwrap()
                .for_at_most(Duration::hours(1))
                .unwrap()
                .within(Duration::seconds(30))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("document");
    let stream = Stream::new("bench");
    let conds = create_conditions(&stream, 50);

    let query = Query::select(any_of(conds))
        .returning(Projection::new().include_default(false).stream(
            &stream,
            [("f0", ProjExpr::from(EventPath::root().field("f0")) * 2)],
        ))
        .build()
        .unwrap();

    group.bench_function("to_json_string", |b| {
        b.iter(|| black_box(&query).to_json_string().unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_combinators, bench_constraints, bench_document);
criterion_main!(benches);
