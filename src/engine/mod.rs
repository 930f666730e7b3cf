//! The per-model optimizer engine.
//!
//! An [`OptimizerEngine`] drives one [`Strategy`] over one model's
//! [`SearchSpace`](crate::space::SearchSpace) through three phases:
//!
//! 1. **Init**: resolve the [`InitSpec`] into an initial position (random,
//!    warm start or best of a scatter sample) and evaluate it.
//! 2. **Running**: exactly `n_iter` iterations of propose, evaluate,
//!    accept, update the global best, coordinate.
//! 3. **Done**: the global best and the histories are frozen into a
//!    [`SearchResult`].
//!
//! Every score goes through the [`EvaluationCache`] first, so the objective
//! runs at most once per distinct assignment.
//!
//! ```
//! use hypersearch::engine::OptimizerEngine;
//! use hypersearch::prelude::*;
//!
//! let space = SearchSpace::new(vec![Dimension::range("x", 0..50)]).unwrap();
//! let config = SearchConfig::new().model("peak", space, |p: &ParameterAssignment, _: &()| {
//!     let x = p.get("x").and_then(ParamValue::as_f64).unwrap_or_default();
//!     Ok::<_, String>(-(x - 20.0).abs())
//! });
//! let cache = EvaluationCache::in_memory();
//!
//! let result = OptimizerEngine::new(&config.models()[0], &(), &cache, StrategyKind::HillClimbing.build(), 7)
//!     .n_iter(100)
//!     .run()
//!     .unwrap();
//! assert_eq!(result.history.len(), 100);
//! assert!(result.best_score >= result.initial_score);
//! ```

mod result;

pub use result::{IterationReport, SearchResult};

use crate::cache::EvaluationCache;
use crate::config::{InitSpec, ModelConfig};
use crate::error::{Error, Result};
use crate::objective::ObjectiveFn;
use crate::space::{ParameterAssignment, Position};
use crate::state::{OptimizerState, Scored};
use crate::strategy::{Strategy, fittest};
use crate::types::{Direction, Phase};

type IterationCallback<'a> = Box<dyn FnMut(&IterationReport<'_>) + 'a>;

/// Resolves scores through the cache, falling back to the objective.
struct Evaluator<'a, D: ?Sized> {
    model: &'a ModelConfig<D>,
    data: &'a D,
    cache: &'a EvaluationCache,
    direction: Direction,
    n_evaluations: usize,
    n_cache_hits: usize,
}

impl<D: ?Sized + Sync> Evaluator<'_, D> {
    fn evaluate(&mut self, positions: Vec<Position>, iteration: usize) -> Result<Vec<Scored>> {
        let id = self.model.id.as_str();
        let space = &self.model.space;

        let mut assignments = Vec::with_capacity(positions.len());
        for position in &positions {
            if !space.contains(position) {
                return Err(Error::InvalidPosition {
                    model: id.to_owned(),
                    position: position.clone(),
                    reason: format!("outside the search space bounds {:?}", space.bounds()),
                });
            }
            assignments.push(space.decode(position).map_err(|e| e.in_model(id))?);
        }

        // Candidates equal to an earlier one in the same batch share its
        // evaluation.
        let mut scores: Vec<Option<f64>> = vec![None; positions.len()];
        let mut pending: Vec<usize> = Vec::new();
        let mut aliases: Vec<(usize, usize)> = Vec::new();
        for i in 0..assignments.len() {
            if let Some(slot) = pending.iter().position(|&k| assignments[k] == assignments[i]) {
                aliases.push((i, slot));
                continue;
            }
            match self.cache.lookup(id, &assignments[i])? {
                Some(score) => {
                    scores[i] = Some(score);
                    self.n_cache_hits += 1;
                }
                None => pending.push(i),
            }
        }

        let batch: Vec<&ParameterAssignment> = pending.iter().map(|&k| &assignments[k]).collect();
        let outcomes = invoke(&self.model.objective, self.data, &batch);
        let mut resolved = Vec::with_capacity(pending.len());
        for (&k, outcome) in pending.iter().zip(outcomes) {
            self.n_evaluations += 1;
            let score = outcome.and_then(|s| {
                if s.is_finite() {
                    Ok(s)
                } else {
                    Err(format!("objective returned a non-finite score ({s})"))
                }
            });
            let score = score.map_err(|message| Error::Evaluation {
                model: id.to_owned(),
                iteration,
                position: positions[k].clone(),
                message,
                history: Vec::new(),
            })?;
            let winning = self.cache.store(id, &assignments[k], score)?;
            scores[k] = Some(winning);
            resolved.push(winning);
        }
        for (i, slot) in aliases {
            scores[i] = Some(resolved[slot]);
            self.n_cache_hits += 1;
        }

        Ok(positions
            .into_iter()
            .zip(scores)
            .filter_map(|(position, score)| {
                score.map(|s| Scored::new(position, s, self.direction))
            })
            .collect())
    }
}

/// Runs the objective over `batch`, in parallel when the `parallel`
/// feature is on. Outcomes keep the batch order.
fn invoke<D: ?Sized + Sync>(
    objective: &ObjectiveFn<D>,
    data: &D,
    batch: &[&ParameterAssignment],
) -> Vec<core::result::Result<f64, String>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if batch.len() > 1 {
            return batch.par_iter().map(|&params| objective(params, data)).collect();
        }
    }
    batch.iter().map(|&params| objective(params, data)).collect()
}

/// Runs one strategy over one model.
pub struct OptimizerEngine<'a, D: ?Sized> {
    eval: Evaluator<'a, D>,
    strategy: Box<dyn Strategy>,
    init: Option<InitSpec>,
    n_iter: usize,
    rng: fastrand::Rng,
    phase: Phase,
    state: Option<OptimizerState>,
    initial_score: f64,
    history: Vec<f64>,
    best_history: Vec<f64>,
    on_iteration: Option<IterationCallback<'a>>,
}

impl<'a, D: ?Sized + Sync> OptimizerEngine<'a, D> {
    /// Creates an engine in the [`Init`](Phase::Init) phase.
    ///
    /// Defaults: maximize, zero iterations, random initial position.
    #[must_use]
    pub fn new(
        model: &'a ModelConfig<D>,
        data: &'a D,
        cache: &'a EvaluationCache,
        strategy: Box<dyn Strategy>,
        seed: u64,
    ) -> Self {
        Self {
            eval: Evaluator {
                model,
                data,
                cache,
                direction: Direction::Maximize,
                n_evaluations: 0,
                n_cache_hits: 0,
            },
            strategy,
            init: None,
            n_iter: 0,
            rng: fastrand::Rng::with_seed(seed),
            phase: Phase::Init,
            state: None,
            initial_score: f64::NAN,
            history: Vec::new(),
            best_history: Vec::new(),
            on_iteration: None,
        }
    }

    /// Sets the optimization direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.eval.direction = direction;
        self
    }

    /// Sets the number of iterations after initialization.
    #[must_use]
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Sets how the initial position is chosen.
    #[must_use]
    pub fn init(mut self, spec: Option<InitSpec>) -> Self {
        self.init = spec;
        self
    }

    /// Registers a callback invoked after every iteration.
    #[must_use]
    pub fn on_iteration(mut self, callback: impl FnMut(&IterationReport<'_>) + 'a) -> Self {
        self.on_iteration = Some(Box::new(callback));
        self
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The running state, available once initialized.
    #[must_use]
    pub fn state(&self) -> Option<&OptimizerState> {
        self.state.as_ref()
    }

    /// The model identifier.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.eval.model.id
    }

    /// Resolves and evaluates the initial position. No-op after the first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if an applicable warm start names
    /// an unknown dimension or value, or [`Error::Evaluation`] if the initial evaluation fails.
    pub fn initialize(&mut self) -> Result<()> {
        if self.phase != Phase::Init {
            return Ok(());
        }
        let model = self.eval.model;
        let space = &model.space;
        let id = model.id.as_str();

        let spec = match self.init.take() {
            Some(spec) if !spec.applies_to(space) => {
                trace_warn!(
                    model = id,
                    "warm start does not begin with the first hyperparameter, starting at random"
                );
                None
            }
            other => other,
        };
        if let Some(spec) = &spec {
            spec.validate(space).map_err(|e| e.in_model(id))?;
        }
        let initial = match spec {
            Some(InitSpec::Scatter(n)) => {
                let positions = (0..n.max(1))
                    .map(|_| space.random_position(&mut self.rng))
                    .collect();
                let scored = self.eval.evaluate(positions, 0)?;
                fittest(&scored).and_then(|i| scored.into_iter().nth(i))
            }
            Some(InitSpec::WarmStart(assignment)) => {
                let position = space
                    .encode_partial(&assignment, &mut self.rng)
                    .map_err(|e| e.in_model(id))?;
                self.eval.evaluate(vec![position], 0)?.into_iter().next()
            }
            None => {
                let position = space.random_position(&mut self.rng);
                self.eval.evaluate(vec![position], 0)?.into_iter().next()
            }
        };
        let initial = initial
            .ok_or_else(|| Error::invalid_space("no initial position was evaluated").in_model(id))?;

        trace_info!(model = id, score = initial.score, "initial position evaluated");
        self.initial_score = initial.score;
        self.state = Some(OptimizerState::new(initial));
        self.phase = if self.n_iter == 0 {
            Phase::Done
        } else {
            Phase::Running
        };
        Ok(())
    }

    /// Runs one iteration, initializing first if needed. No-op once done.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPosition`] if the strategy proposes a position
    /// outside the space, or [`Error::Evaluation`] if the objective fails.
    pub fn step(&mut self) -> Result<()> {
        self.initialize()?;
        if self.phase == Phase::Done {
            return Ok(());
        }
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        let model = self.eval.model;
        let iteration = state.iteration() + 1;

        let proposals = self.strategy.propose(state, &model.space, &mut self.rng);
        if proposals.is_empty() {
            return Err(Error::InvalidPosition {
                model: model.id.clone(),
                position: Position::default(),
                reason: format!("{} proposed no candidates", self.strategy.name()),
            });
        }
        let evaluated = self
            .eval
            .evaluate(proposals, iteration)
            .map_err(|e| e.with_history(&self.history))?;

        self.strategy.accept(state, &evaluated, &mut self.rng);
        let before = state.best().fitness;
        for candidate in &evaluated {
            state.offer_best(candidate);
        }
        let improved = state.best().fitness > before;
        let score = fittest(&evaluated).map_or(f64::NAN, |i| evaluated[i].score);
        self.history.push(score);
        self.best_history.push(state.best().score);
        state.advance();
        self.strategy.coordinate(state, &mut self.rng);

        if improved {
            trace_debug!(
                model = model.id.as_str(),
                iteration,
                score = state.best().score,
                "new best"
            );
        }
        if let Some(callback) = self.on_iteration.as_mut() {
            callback(&IterationReport {
                model: &model.id,
                iteration,
                score,
                best_score: state.best().score,
                improved,
            });
        }
        if state.iteration() >= self.n_iter {
            self.phase = Phase::Done;
        }
        Ok(())
    }

    /// Runs initialization and every remaining iteration, then freezes the result.
    ///
    /// # Errors
    ///
    /// Any error from [`initialize`](Self::initialize) or [`step`](Self::step).
    pub fn run(mut self) -> Result<SearchResult> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "search_model",
            model = %self.eval.model.id,
            strategy = self.strategy.name(),
            n_iter = self.n_iter
        )
        .entered();

        self.initialize()?;
        while self.phase == Phase::Running {
            self.step()?;
        }
        self.finish()
    }

    /// Freezes the best position and histories into a [`SearchResult`],
    /// initializing first if needed.
    ///
    /// # Errors
    ///
    /// Any error from [`initialize`](Self::initialize).
    pub fn finish(mut self) -> Result<SearchResult> {
        self.initialize()?;
        let model = self.eval.model;
        let state = self.state.ok_or_else(|| {
            Error::invalid_space("engine finished without an initial position").in_model(&model.id)
        })?;
        let best = state.best();
        let best_params = model
            .space
            .decode(&best.position)
            .map_err(|e| e.in_model(&model.id))?;
        trace_info!(
            model = model.id.as_str(),
            best_score = best.score,
            evaluations = self.eval.n_evaluations,
            "search finished"
        );
        Ok(SearchResult {
            model: model.id.clone(),
            strategy: self.strategy.name(),
            best_params,
            best_position: best.position.clone(),
            best_score: best.score,
            initial_score: self.initial_score,
            history: self.history,
            best_history: self.best_history,
            n_evaluations: self.eval.n_evaluations,
            n_cache_hits: self.eval.n_cache_hits,
        })
    }
}
