//! Integration tests for concurrent multi-model search.

use std::sync::Arc;

use hypersearch::prelude::*;

fn space() -> SearchSpace {
    SearchSpace::new(vec![
        Dimension::range("n_estimators", 10..200),
        Dimension::new("bootstrap", [true, false]),
    ])
    .unwrap()
}

fn forest(p: &ParameterAssignment, weights: &[f64]) -> Result<f64, String> {
    let n = p.get("n_estimators").and_then(ParamValue::as_f64).ok_or("n_estimators")?;
    let bootstrap = p.get("bootstrap").and_then(ParamValue::as_bool).ok_or("bootstrap")?;
    let w = weights.first().copied().unwrap_or(1.0);
    Ok(-w * (n - 120.0).abs() + if bootstrap { 1.0 } else { 0.0 })
}

fn config() -> SearchConfig<[f64]> {
    SearchConfig::new()
        .model("a", space(), forest)
        .model("b", space(), forest)
        .model("c", space(), |_: &ParameterAssignment, _: &[f64]| Err("diverged"))
        .model("d", space(), forest)
}

fn controller() -> SearchController {
    SearchController::builder()
        .strategy(StrategyKind::ParallelTempering)
        .n_iter(20)
        .random_state(13)
        .build()
}

#[tokio::test]
async fn parallel_matches_sequential() {
    let config = config();
    let data: Arc<[f64]> = Arc::from(vec![0.5, 2.0]);

    let sequential = controller().search(&config, &InitConfig::new(), &*data).unwrap();
    let parallel = controller()
        .search_parallel(&config, &InitConfig::new(), Arc::clone(&data), 3)
        .await
        .unwrap();

    let ids: Vec<&str> = parallel.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, ["a", "b", "c", "d"]);
    for id in ["a", "b", "d"] {
        assert_eq!(sequential.result(id), parallel.result(id), "{id}");
    }
    assert!(parallel.error("c").is_some());
}

#[tokio::test]
async fn concurrency_of_one_still_finishes() {
    let report = controller()
        .search_parallel(&config(), &InitConfig::new(), Arc::from(vec![1.0]), 1)
        .await
        .unwrap();
    assert_eq!(report.len(), 4);
    assert_eq!(report.successes().count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_cache_is_safe_across_tasks() {
    let controller = controller();
    let config = SearchConfig::new()
        .model("x", space(), forest)
        .model("y", space(), forest);
    let data: Arc<[f64]> = Arc::from(vec![1.0]);
    let first = controller
        .search_parallel(&config, &InitConfig::new(), Arc::clone(&data), 2)
        .await
        .unwrap();
    let cached = controller.cache().len();
    let second = controller
        .search_parallel(&config, &InitConfig::new(), data, 2)
        .await
        .unwrap();
    assert_eq!(controller.cache().len(), cached);
    assert_eq!(first.best_score("x"), second.best_score("x"));
    assert_eq!(second.result("y").map(|r| r.n_evaluations), Some(0));
}
