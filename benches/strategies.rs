use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hypersearch::engine::OptimizerEngine;
use hypersearch::prelude::*;

/// Sphere of `dims` integer dimensions with 50 candidates each.
fn sphere_config(dims: usize) -> SearchConfig<()> {
    let space = SearchSpace::new(
        (0..dims)
            .map(|i| Dimension::range(format!("x{i}"), -25..25))
            .collect(),
    )
    .unwrap();
    SearchConfig::new().model("sphere", space, |p: &ParameterAssignment, _: &()| {
        Ok::<_, String>(-p.iter().filter_map(|(_, v)| v.as_f64()).map(|x| x * x).sum::<f64>())
    })
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_run");
    let config = sphere_config(4);

    for kind in StrategyKind::ALL {
        group.bench_with_input(BenchmarkId::new("n_iter_100", kind), &kind, |b, &kind| {
            b.iter(|| {
                let cache = EvaluationCache::in_memory();
                OptimizerEngine::new(&config.models()[0], &(), &cache, kind.build(), 42)
                    .n_iter(100)
                    .run()
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_bayesian_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("bayesian");
    group.sample_size(10);

    for dims in [2, 6] {
        let config = sphere_config(dims);
        group.bench_with_input(BenchmarkId::new("dims", dims), &dims, |b, _| {
            b.iter(|| {
                let cache = EvaluationCache::in_memory();
                OptimizerEngine::new(
                    &config.models()[0],
                    &(),
                    &cache,
                    StrategyKind::Bayesian.build(),
                    7,
                )
                .n_iter(40)
                .run()
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let cache = EvaluationCache::in_memory();
    let params = ParameterAssignment::new()
        .with("criterion", "gini")
        .with("max_depth", 12)
        .with("scaler", OpaqueValue::new("scaler", vec![7u8; 256]));
    cache.store("tree", &params, 0.9).unwrap();

    group.bench_function("lookup_hit", |b| {
        b.iter(|| cache.lookup("tree", &params).unwrap());
    });
    group.bench_function("lookup_miss", |b| {
        let other = params.clone().with("max_depth", 13);
        b.iter(|| cache.lookup("tree", &other).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_bayesian_history, bench_cache);
criterion_main!(benches);
