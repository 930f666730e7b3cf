//! Search strategies.
//!
//! A [`Strategy`] decides which positions to evaluate next and how the
//! results move its own state. The engine owns everything else: bounds
//! checking, caching, the global best and the histories.
//!
//! | Strategy | Kind | Candidates per iteration |
//! |----------|------|--------------------------|
//! | [`HillClimbing`] | local | 1 |
//! | [`StochasticHillClimbing`] | local | 1 |
//! | [`TabuSearch`] | local | `n_neighbours` |
//! | [`RandomSearch`] | global | 1 |
//! | [`RandomRestartHillClimbing`] | local + restarts | 1 |
//! | [`RandomAnnealing`] | local, shrinking radius | 1 |
//! | [`SimulatedAnnealing`] | local, Metropolis | 1 |
//! | [`StochasticTunneling`] | local, transformed energy | 1 |
//! | [`ParallelTempering`] | ensemble | `n_replicas` |
//! | [`ParticleSwarm`] | ensemble | `n_particles` |
//! | [`EvolutionStrategy`] | ensemble | `lambda` |
//! | [`Bayesian`] | surrogate model | 1 |
//!
//! Ensemble strategies own their replicas (particles, individuals,
//! temperature instances) together with the shared aggregates such as the
//! swarm best or the temperature ladder. Proposals read those aggregates as
//! they stood at the start of the step; [`Strategy::coordinate`] is the only
//! place they are written back, once every replica of the step has been
//! evaluated. The controller never touches replica state.
//!
//! Ensemble strategies seed their replicas on the first iteration: replica
//! 0 moves from the initial position, the others start at random positions.
//!
//! Pick a strategy by name with [`StrategyKind`], or build one directly to
//! change its settings:
//!
//! ```
//! use hypersearch::strategy::{SimulatedAnnealing, Strategy, StrategyKind};
//!
//! let kind: StrategyKind = "SimulatedAnnealing".parse().unwrap();
//! assert_eq!(kind.build().name(), "SimulatedAnnealing");
//!
//! let hot = SimulatedAnnealing::new().initial_temperature(5.0).alpha(0.99);
//! assert_eq!(hot.name(), "SimulatedAnnealing");
//! ```

mod annealing;
mod bayesian;
mod evolution;
mod hill_climbing;
mod random;
mod swarm;
mod tabu;
mod tempering;

use core::fmt;
use core::str::FromStr;

pub use annealing::{GeometricCooling, SimulatedAnnealing, StochasticTunneling};
pub use bayesian::Bayesian;
pub use evolution::EvolutionStrategy;
pub use hill_climbing::{HillClimbing, RandomRestartHillClimbing, StochasticHillClimbing};
pub use random::{RandomAnnealing, RandomSearch};
pub use swarm::ParticleSwarm;
pub use tabu::TabuSearch;
pub use tempering::ParallelTempering;

use crate::error::Error;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// A search strategy over integer positions.
///
/// Each iteration the engine calls [`propose`](Strategy::propose), evaluates
/// the returned positions in order, passes the results to
/// [`accept`](Strategy::accept), updates the global best, and finally calls
/// [`coordinate`](Strategy::coordinate). All randomness must come from the
/// generator passed in so runs are reproducible.
pub trait Strategy: Send {
    /// The strategy's name, as accepted by [`StrategyKind::from_str`].
    fn name(&self) -> &'static str;

    /// Returns the positions to evaluate this iteration (at least one).
    ///
    /// Every position must lie inside `space`; the engine rejects anything
    /// else with [`Error::InvalidPosition`].
    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position>;

    /// Updates the strategy and the current position from the scored
    /// proposals, given in proposal order.
    fn accept(&mut self, state: &mut OptimizerState, evaluated: &[Scored], rng: &mut fastrand::Rng);

    /// Barrier step run after the global best is updated. Ensembles
    /// exchange information between replicas here. `state.iteration()`
    /// already counts the finished iteration.
    fn coordinate(&mut self, state: &mut OptimizerState, rng: &mut fastrand::Rng) {
        let _ = (state, rng);
    }
}

/// The closed set of built-in strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// [`HillClimbing`]
    HillClimbing,
    /// [`StochasticHillClimbing`]
    StochasticHillClimbing,
    /// [`TabuSearch`]
    TabuSearch,
    /// [`RandomSearch`]
    RandomSearch,
    /// [`RandomRestartHillClimbing`]
    RandomRestartHillClimbing,
    /// [`RandomAnnealing`]
    RandomAnnealing,
    /// [`SimulatedAnnealing`]
    SimulatedAnnealing,
    /// [`StochasticTunneling`]
    StochasticTunneling,
    /// [`ParallelTempering`]
    ParallelTempering,
    /// [`ParticleSwarm`]
    ParticleSwarm,
    /// [`EvolutionStrategy`]
    EvolutionStrategy,
    /// [`Bayesian`]
    Bayesian,
}

impl StrategyKind {
    /// Every built-in strategy, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::HillClimbing,
        Self::StochasticHillClimbing,
        Self::TabuSearch,
        Self::RandomSearch,
        Self::RandomRestartHillClimbing,
        Self::RandomAnnealing,
        Self::SimulatedAnnealing,
        Self::StochasticTunneling,
        Self::ParallelTempering,
        Self::ParticleSwarm,
        Self::EvolutionStrategy,
        Self::Bayesian,
    ];

    /// The canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HillClimbing => "HillClimbing",
            Self::StochasticHillClimbing => "StochasticHillClimbing",
            Self::TabuSearch => "TabuSearch",
            Self::RandomSearch => "RandomSearch",
            Self::RandomRestartHillClimbing => "RandomRestartHillClimbing",
            Self::RandomAnnealing => "RandomAnnealing",
            Self::SimulatedAnnealing => "SimulatedAnnealing",
            Self::StochasticTunneling => "StochasticTunneling",
            Self::ParallelTempering => "ParallelTempering",
            Self::ParticleSwarm => "ParticleSwarm",
            Self::EvolutionStrategy => "EvolutionStrategy",
            Self::Bayesian => "Bayesian",
        }
    }

    /// Builds a fresh instance with default settings.
    #[must_use]
    pub fn build(self) -> Box<dyn Strategy> {
        match self {
            Self::HillClimbing => Box::new(HillClimbing::new()),
            Self::StochasticHillClimbing => Box::new(StochasticHillClimbing::new()),
            Self::TabuSearch => Box::new(TabuSearch::new()),
            Self::RandomSearch => Box::new(RandomSearch::new()),
            Self::RandomRestartHillClimbing => Box::new(RandomRestartHillClimbing::new()),
            Self::RandomAnnealing => Box::new(RandomAnnealing::new()),
            Self::SimulatedAnnealing => Box::new(SimulatedAnnealing::new()),
            Self::StochasticTunneling => Box::new(StochasticTunneling::new()),
            Self::ParallelTempering => Box::new(ParallelTempering::new()),
            Self::ParticleSwarm => Box::new(ParticleSwarm::new()),
            Self::EvolutionStrategy => Box::new(EvolutionStrategy::new()),
            Self::Bayesian => Box::new(Bayesian::new()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    /// Matches the canonical name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownStrategy(s.to_owned()))
    }
}

/// Moves one random dimension by `step` indices, clamped to its bounds.
///
/// Only dimensions with more than one candidate are picked. At a boundary
/// the move goes the other way, so the result differs from `from` whenever
/// any dimension can move at all.
pub(crate) fn local_move(
    from: &Position,
    space: &SearchSpace,
    step: usize,
    rng: &mut fastrand::Rng,
) -> Position {
    let movable: Vec<usize> = space
        .dimensions()
        .iter()
        .enumerate()
        .filter(|(_, d)| d.len() > 1)
        .map(|(i, _)| i)
        .collect();
    let mut next = from.clone();
    if movable.is_empty() {
        return next;
    }
    let d = movable[rng.usize(0..movable.len())];
    let max = space.dimensions()[d].max_index();
    let step = step.max(1);
    let current = next[d].min(max);
    let up = (current + step).min(max);
    let down = current.saturating_sub(step);
    next[d] = match (rng.bool(), up == current, down == current) {
        (true, false, _) | (false, _, true) => up,
        _ => down,
    };
    next
}

/// Index of the fittest entry; ties go to the later entry.
pub(crate) fn fittest(scored: &[Scored]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, s) in scored.iter().enumerate() {
        if best.is_none_or(|b| s.fitness >= scored[b].fitness) {
            best = Some(i);
        }
    }
    best
}

/// Normalized fitness loss of moving from `current` to `candidate`, in
/// `[0, 1]` when both fitnesses share a sign.
pub(crate) fn normalized_loss(current: f64, candidate: f64) -> f64 {
    let denom = current.abs() + candidate.abs();
    if denom > 0.0 {
        (current - candidate) / denom
    } else {
        0.0
    }
}

/// Metropolis acceptance for a strictly worse candidate.
pub(crate) fn metropolis(delta: f64, temperature: f64, rng: &mut fastrand::Rng) -> bool {
    if temperature <= 0.0 {
        return false;
    }
    rng.f64() < (-delta / temperature).exp()
}
