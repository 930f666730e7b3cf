#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Metaheuristic hyperparameter search over discrete spaces. Twelve
//! strategies (hill climbing variants, tabu search, annealing, parallel
//! tempering, particle swarm, evolution strategy and a Gaussian-process
//! Bayesian optimizer) walk integer positions of a [`SearchSpace`], while a
//! content-addressed [`EvaluationCache`] guarantees the objective runs at
//! most once per distinct assignment.
//!
//! # Getting Started
//!
//! ```
//! use hypersearch::prelude::*;
//!
//! let space = SearchSpace::new(vec![
//!     Dimension::new("criterion", ["gini", "entropy"]),
//!     Dimension::range("max_depth", 1..21),
//! ])
//! .unwrap();
//!
//! let config = SearchConfig::new().model("tree", space, |p: &ParameterAssignment, _: &()| {
//!     let depth = p.get("max_depth").and_then(ParamValue::as_f64).unwrap_or(0.0);
//!     Ok::<_, String>(-(depth - 7.0).powi(2))
//! });
//!
//! let report = SearchController::builder()
//!     .strategy(StrategyKind::SimulatedAnnealing)
//!     .n_iter(50)
//!     .random_state(42)
//!     .build()
//!     .search(&config, &InitConfig::new(), &())
//!     .unwrap();
//!
//! let best = report.result("tree").unwrap();
//! println!("{} -> {}", best.best_params, best.best_score);
//! assert!(best.best_score >= best.initial_score);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`SearchSpace`] | Ordered named dimensions of candidate values; encodes assignments as [`Position`]s. |
//! | [`EvaluationCache`] | Content-addressed `(model, assignment) -> score` memo, in memory or on disk. |
//! | [`Strategy`](strategy::Strategy) | Proposes candidate positions and updates its own state from their scores. |
//! | [`OptimizerEngine`](engine::OptimizerEngine) | Drives one strategy over one model: init, iterations, result. |
//! | [`SearchController`] | Runs every model of a [`SearchConfig`] and collects a [`SearchReport`]. |
//!
//! # Strategy Guide
//!
//! | Strategy | Family | Candidates per iteration |
//! |----------|--------|--------------------------|
//! | [`HillClimbing`](strategy::HillClimbing) | local search | 1 |
//! | [`StochasticHillClimbing`](strategy::StochasticHillClimbing) | local search | 1 |
//! | [`TabuSearch`](strategy::TabuSearch) | local search | `n_neighbours` |
//! | [`RandomSearch`](strategy::RandomSearch) | global | 1 |
//! | [`RandomRestartHillClimbing`](strategy::RandomRestartHillClimbing) | global | 1 |
//! | [`RandomAnnealing`](strategy::RandomAnnealing) | global | 1 |
//! | [`SimulatedAnnealing`](strategy::SimulatedAnnealing) | annealing | 1 |
//! | [`StochasticTunneling`](strategy::StochasticTunneling) | annealing | 1 |
//! | [`ParallelTempering`](strategy::ParallelTempering) | ensemble | one per replica |
//! | [`ParticleSwarm`](strategy::ParticleSwarm) | ensemble | one per particle |
//! | [`EvolutionStrategy`](strategy::EvolutionStrategy) | ensemble | `lambda` |
//! | [`Bayesian`](strategy::Bayesian) | surrogate model | 1 |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | [`SearchController::search_parallel`] via tokio | off |
//! | `journal` | [`JournalStore`](cache::JournalStore): durable cache with file locking | off |
//! | `parallel` | Batches of candidates evaluated on the rayon pool | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key search points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod cache;
pub mod config;
pub mod controller;
pub mod engine;
mod error;
pub mod objective;
mod rng_util;
pub mod space;
pub mod state;
pub mod strategy;
mod types;
pub mod value;

pub use cache::EvaluationCache;
pub use config::{InitConfig, InitSpec, SearchConfig};
pub use controller::{SearchController, SearchReport};
pub use engine::SearchResult;
pub use error::{Error, Result};
pub use objective::Objective;
pub use space::{Dimension, ParameterAssignment, Position, SearchSpace};
pub use types::{Direction, Phase};
pub use value::{OpaqueValue, ParamValue};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use hypersearch::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "journal")]
    pub use crate::cache::JournalStore;
    pub use crate::cache::{CacheStore, EvaluationCache, MemoryStore};
    pub use crate::config::{DimensionSpec, InitConfig, InitSpec, SearchConfig};
    pub use crate::controller::{SearchController, SearchReport};
    pub use crate::engine::{IterationReport, SearchResult};
    pub use crate::error::{Error, Result};
    pub use crate::objective::Objective;
    pub use crate::space::{Dimension, ParameterAssignment, Position, SearchSpace};
    pub use crate::strategy::{Strategy, StrategyKind};
    pub use crate::types::{Direction, Phase};
    pub use crate::value::{OpaqueValue, ParamValue};
}
