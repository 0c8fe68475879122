use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jwasm_compiler::{DataSection, StringPool};

fn literals(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("literal #{} \u{e9}\u{4e2d}", i))
        .collect()
}

fn bench_intern(c: &mut Criterion) {
    let strings = literals(1_000);

    c.bench_function("intern_with_repeats", |b| {
        b.iter(|| {
            let mut pool = StringPool::new();
            for _ in 0..3 {
                for s in &strings {
                    pool.intern(black_box(s)).unwrap();
                }
            }
            pool
        });
    });
}

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    for count in [10usize, 1_000, 10_000] {
        let strings = literals(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("strings", count), &strings, |b, strings| {
            b.iter(|| {
                let mut pool = StringPool::new();
                for s in strings {
                    pool.intern(s).unwrap();
                }
                let mut data = DataSection::new();
                pool.finalize(&mut data).unwrap();
                black_box(data)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_intern, bench_finalize);
criterion_main!(benches);
