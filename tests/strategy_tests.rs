//! Properties every built-in strategy must satisfy when driven by the engine.

use hypersearch::engine::OptimizerEngine;
use hypersearch::prelude::*;

fn space() -> SearchSpace {
    SearchSpace::new(vec![
        Dimension::range("x", 0..40),
        Dimension::range("y", -10..10),
        Dimension::new("mode", ["fast", "slow", "auto"]),
        Dimension::new("flag", [true, false]),
    ])
    .unwrap()
}

fn rastrigin_like(p: &ParameterAssignment, _: &()) -> Result<f64, String> {
    let x = p.get("x").and_then(ParamValue::as_f64).ok_or("x")?;
    let y = p.get("y").and_then(ParamValue::as_f64).ok_or("y")?;
    let mode = match p.get("mode").and_then(ParamValue::as_str) {
        Some("auto") => 2.0,
        Some("slow") => 1.0,
        _ => 0.0,
    };
    let flag = if p.get("flag").and_then(ParamValue::as_bool) == Some(true) { 0.5 } else { 0.0 };
    let wave = (x * 0.7).sin() + (y * 1.3).cos();
    Ok(-((x - 27.0).powi(2) + (y - 3.0).powi(2)) / 10.0 + wave + mode + flag)
}

fn run(kind: StrategyKind, seed: u64, n_iter: usize) -> SearchResult {
    let config = SearchConfig::new().model("m", space(), rastrigin_like);
    let cache = EvaluationCache::in_memory();
    OptimizerEngine::new(&config.models()[0], &(), &cache, kind.build(), seed)
        .n_iter(n_iter)
        .run()
        .unwrap_or_else(|e| panic!("{kind} failed: {e}"))
}

#[test]
fn every_strategy_stays_in_bounds() {
    let space = space();
    for kind in StrategyKind::ALL {
        let result = run(kind, 11, 40);
        assert!(space.contains(&result.best_position), "{kind}");
        assert_eq!(result.history.len(), 40, "{kind}");
    }
}

#[test]
fn global_best_never_decreases() {
    for kind in StrategyKind::ALL {
        let result = run(kind, 3, 40);
        assert!(
            result.best_history.windows(2).all(|w| w[1] >= w[0]),
            "{kind}: {:?}",
            result.best_history
        );
        assert!(result.best_history[0] >= result.initial_score, "{kind}");
        let seen_max = result
            .history
            .iter()
            .copied()
            .fold(result.initial_score, f64::max);
        assert_eq!(result.best_score, seen_max, "{kind}");
    }
}

#[test]
fn same_seed_same_run() {
    for kind in StrategyKind::ALL {
        assert_eq!(run(kind, 99, 25), run(kind, 99, 25), "{kind}");
    }
}

#[test]
fn seeds_change_the_trajectory() {
    let a = run(StrategyKind::RandomSearch, 1, 30);
    let b = run(StrategyKind::RandomSearch, 2, 30);
    assert_ne!(a.history, b.history);
}

#[test]
fn longer_budget_extends_the_same_run() {
    for kind in StrategyKind::ALL {
        let short = run(kind, 21, 10);
        let long = run(kind, 21, 60);
        assert_eq!(short.history[..], long.history[..10], "{kind}");
        assert!(long.best_score >= short.best_score, "{kind}");
    }
}

#[test]
fn strategy_names_parse_back() {
    for kind in StrategyKind::ALL {
        let parsed: StrategyKind = kind.name().parse().unwrap();
        assert_eq!(parsed, kind);
        assert_eq!(kind.build().name(), kind.name());
    }
    assert!(matches!(
        "GradientDescent".parse::<StrategyKind>(),
        Err(Error::UnknownStrategy(_))
    ));
}

#[test]
fn single_point_space_is_searchable() {
    let space = SearchSpace::new(vec![Dimension::new("only", [7])]).unwrap();
    for kind in StrategyKind::ALL {
        let config = SearchConfig::new()
            .model("tiny", space.clone(), |_: &ParameterAssignment, _: &()| Ok::<_, String>(1.0));
        let cache = EvaluationCache::in_memory();
        let result = OptimizerEngine::new(&config.models()[0], &(), &cache, kind.build(), 5)
            .n_iter(8)
            .run()
            .unwrap();
        assert_eq!(result.best_position, Position::new(vec![0]), "{kind}");
        assert_eq!(result.n_evaluations, 1, "{kind}");
    }
}
