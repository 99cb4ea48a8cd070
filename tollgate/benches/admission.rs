use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tollgate::AdmissionGate;

fn gate(capacity: u64) -> AdmissionGate {
    AdmissionGate::builder()
        .capacity(capacity)
        .refill_interval(Duration::from_millis(1))
        .refill_amount(capacity)
        .build()
        .unwrap()
}

fn benchmark_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_check");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("single_key", |b| {
        let gate = gate(1000);
        b.iter(|| black_box(gate.check(black_box("test_key"), Instant::now())));
    });

    // Test with multiple keys to simulate real-world usage
    group.bench_function("rotating_keys_1000", |b| {
        let gate = gate(100);
        let keys: Vec<String> = (0..1000).map(|i| format!("ip:10.0.{}.{}", i / 256, i % 256)).collect();
        let mut counter = 0usize;

        b.iter(|| {
            let key = &keys[counter % keys.len()];
            counter += 1;
            black_box(gate.check(black_box(key), Instant::now()))
        });
    });

    group.bench_function("new_key_each_call", |b| {
        let gate = gate(10);
        let mut counter = 0u64;

        b.iter(|| {
            let key = format!("client_{counter}");
            counter += 1;
            black_box(gate.check(black_box(&key), Instant::now()))
        });
    });

    group.finish();
}

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_contention");
    group.measurement_time(Duration::from_secs(10));

    for shards in [1usize, 16, 64] {
        group.bench_function(format!("4_threads_{shards}_shards"), |b| {
            let gate = Arc::new(
                AdmissionGate::builder()
                    .capacity(1_000_000)
                    .refill_interval(Duration::from_millis(1))
                    .refill_amount(1_000_000)
                    .shards(shards)
                    .build()
                    .unwrap(),
            );

            b.iter(|| {
                thread::scope(|scope| {
                    for t in 0..4 {
                        let gate = &gate;
                        scope.spawn(move || {
                            for i in 0..250 {
                                let key = format!("t{t}_k{}", i % 32);
                                black_box(gate.check(&key, Instant::now()));
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn benchmark_sweep(c: &mut Criterion) {
    c.bench_function("sweep_100k_keys", |b| {
        let gate = gate(10);
        let start = Instant::now();
        for i in 0..100_000 {
            gate.check(&format!("key_{i}"), start);
        }
        let evictor = gate.evictor();

        // Nothing is idle, so every iteration walks the full store
        b.iter(|| black_box(evictor.sweep(start)));
    });
}

criterion_group!(benches, benchmark_check, benchmark_contention, benchmark_sweep);
criterion_main!(benches);
