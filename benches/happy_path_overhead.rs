use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use resilience::core::CancellationSource;
use resilience::engine::{ResilienceConfig, ResilienceEngine};

#[derive(Debug)]
struct NeverError;

impl std::fmt::Display for NeverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unreachable")
    }
}

fn happy_path_overhead(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = ResilienceConfig::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(1))
        .build()
        .unwrap();
    let engine = ResilienceEngine::new(config).unwrap();
    let cancel = CancellationSource::new();

    let mut group = c.benchmark_group("happy_path");

    group.bench_function("raw_call", |b| {
        b.to_async(&rt).iter(|| async { black_box(Ok::<_, NeverError>(42)) });
    });

    group.bench_function("engine_execute", |b| {
        b.to_async(&rt).iter(|| async {
            let result = engine.execute("bench_op", None, &cancel.token(), || async { Ok::<_, NeverError>(42) }).await;
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(benches, happy_path_overhead);
criterion_main!(benches);
