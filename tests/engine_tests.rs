//! Integration tests for the optimizer engine lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hypersearch::engine::OptimizerEngine;
use hypersearch::prelude::*;
use hypersearch::state::{OptimizerState, Scored};

fn space() -> SearchSpace {
    SearchSpace::new(vec![
        Dimension::range("a", 0..10),
        Dimension::range("b", 0..10),
    ])
    .unwrap()
}

fn constant(_: &ParameterAssignment, _: &()) -> Result<f64, String> {
    Ok(0.5)
}

/// Proposes two fixed positions every iteration, the second one moving.
struct Pairs {
    step: usize,
}

impl Strategy for Pairs {
    fn name(&self) -> &'static str {
        "Pairs"
    }

    fn propose(
        &mut self,
        _: &OptimizerState,
        _: &SearchSpace,
        _: &mut fastrand::Rng,
    ) -> Vec<Position> {
        self.step += 1;
        vec![Position::new(vec![0, 0]), Position::new(vec![self.step % 10, 9])]
    }

    fn accept(&mut self, state: &mut OptimizerState, evaluated: &[Scored], _: &mut fastrand::Rng) {
        state.set_current(evaluated[0].clone());
    }
}

struct Silent;

impl Strategy for Silent {
    fn name(&self) -> &'static str {
        "Silent"
    }

    fn propose(
        &mut self,
        _: &OptimizerState,
        _: &SearchSpace,
        _: &mut fastrand::Rng,
    ) -> Vec<Position> {
        Vec::new()
    }

    fn accept(&mut self, _: &mut OptimizerState, _: &[Scored], _: &mut fastrand::Rng) {}
}

#[test]
fn ties_go_to_the_most_recent_candidate() {
    let config = SearchConfig::new().model("flat", space(), constant);
    let cache = EvaluationCache::in_memory();
    let result = OptimizerEngine::new(
        &config.models()[0],
        &(),
        &cache,
        Box::new(Pairs { step: 0 }),
        1,
    )
    .n_iter(4)
    .run()
    .unwrap();
    assert_eq!(result.best_position, Position::new(vec![4, 9]));
    assert_eq!(result.best_params, ParameterAssignment::new().with("a", 4).with("b", 9));
}

#[test]
fn constant_objective_hill_climbing_keeps_moving() {
    let config = SearchConfig::new().model("flat", space(), constant);
    let cache = EvaluationCache::in_memory();
    let mut positions = Vec::new();
    let mut engine = OptimizerEngine::new(
        &config.models()[0],
        &(),
        &cache,
        StrategyKind::HillClimbing.build(),
        8,
    )
    .n_iter(20);
    engine.initialize().unwrap();
    while engine.phase() == Phase::Running {
        engine.step().unwrap();
        let state = engine.state().unwrap();
        assert_eq!(state.best().position, state.current().position);
        positions.push(state.current().position.clone());
    }
    positions.dedup();
    assert!(positions.len() > 1);
}

#[test]
fn empty_proposal_is_an_error() {
    let config = SearchConfig::new().model("m", space(), constant);
    let cache = EvaluationCache::in_memory();
    let err = OptimizerEngine::new(&config.models()[0], &(), &cache, Box::new(Silent), 1)
        .n_iter(1)
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPosition { .. }));
    assert!(err.to_string().contains("Silent"));
}

#[test]
fn warm_start_fixes_given_dimensions() {
    let config = SearchConfig::new().model("m", space(), constant);
    let cache = EvaluationCache::in_memory();
    let mut engine = OptimizerEngine::new(&config.models()[0], &(), &cache, Box::new(Silent), 4)
        .init(Some(InitSpec::WarmStart(ParameterAssignment::new().with("a", 7))));
    engine.initialize().unwrap();
    assert_eq!(engine.phase(), Phase::Done);
    assert_eq!(engine.state().unwrap().current().position[0], 7);
}

#[test]
fn scatter_evaluates_each_sample_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = SearchConfig::new().model("m", space(), move |p: &ParameterAssignment, _: &()| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(p.get("a").and_then(ParamValue::as_f64).unwrap_or(0.0))
    });
    let cache = EvaluationCache::in_memory();
    let result = OptimizerEngine::new(&config.models()[0], &(), &cache, Box::new(Silent), 12)
        .init(Some(InitSpec::Scatter(40)))
        .run()
        .unwrap();
    let distinct = cache.len();
    assert!(distinct <= 40);
    assert_eq!(calls.load(Ordering::SeqCst), distinct);
    assert_eq!(result.n_evaluations, distinct);
    assert_eq!(result.n_evaluations + result.n_cache_hits, 40);
}

#[test]
fn scatter_of_zero_still_starts_somewhere() {
    let config = SearchConfig::new().model("m", space(), constant);
    let cache = EvaluationCache::in_memory();
    let result = OptimizerEngine::new(&config.models()[0], &(), &cache, Box::new(Silent), 2)
        .init(Some(InitSpec::Scatter(0)))
        .run()
        .unwrap();
    assert_eq!(result.n_evaluations, 1);
}

#[test]
fn objective_sees_the_shared_data() {
    struct Dataset {
        rows: Vec<f64>,
    }

    let space = SearchSpace::new(vec![Dimension::range("k", 1..6)]).unwrap();
    let config = SearchConfig::new().model("knn", space, |p: &ParameterAssignment, d: &Dataset| {
        let k = p.get("k").and_then(ParamValue::as_i64).ok_or("k")?;
        let k = usize::try_from(k).map_err(|e| e.to_string())?;
        Ok::<_, String>(d.rows.iter().take(k).sum::<f64>())
    });
    let data = Dataset { rows: vec![1.0, 2.0, 3.0, -10.0, 4.0] };
    let cache = EvaluationCache::in_memory();
    let result = OptimizerEngine::new(
        &config.models()[0],
        &data,
        &cache,
        StrategyKind::RandomSearch.build(),
        3,
    )
    .n_iter(60)
    .run()
    .unwrap();
    assert_eq!(result.best_score, 6.0);
    assert_eq!(result.best_params.get("k"), Some(&ParamValue::Int(3)));
}

#[test]
fn result_serializes_to_json() {
    let config = SearchConfig::new().model("m", space(), constant);
    let cache = EvaluationCache::in_memory();
    let result = OptimizerEngine::new(
        &config.models()[0],
        &(),
        &cache,
        StrategyKind::TabuSearch.build(),
        6,
    )
    .n_iter(3)
    .run()
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["model"], "m");
    assert_eq!(json["strategy"], "TabuSearch");
    assert_eq!(json["history"].as_array().unwrap().len(), 3);
    assert!(json["best_params"]["a"].is_i64());
}
