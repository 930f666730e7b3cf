use std::sync::Arc;

use super::{SearchController, StrategyFactory};
use crate::cache::EvaluationCache;
use crate::strategy::{Strategy, StrategyKind};
use crate::types::Direction;

/// Builder for configuring a [`SearchController`].
///
/// All options have defaults:
/// - `strategy`: [`StrategyKind::HillClimbing`]
/// - `n_iter`: 10
/// - `random_state`: random
/// - `direction`: [`Direction::Maximize`]
/// - `cache`: a fresh in-memory cache
///
/// # Examples
///
/// ```
/// use hypersearch::prelude::*;
/// use hypersearch::strategy::SimulatedAnnealing;
///
/// let controller = SearchController::builder()
///     .strategy_factory(|| Box::new(SimulatedAnnealing::new().alpha(0.9)))
///     .n_iter(50)
///     .random_state(42)
///     .minimize()
///     .build();
/// assert_eq!(controller.strategy_name(), "SimulatedAnnealing");
/// ```
#[derive(Default)]
pub struct SearchControllerBuilder {
    factory: Option<StrategyFactory>,
    n_iter: Option<usize>,
    random_state: Option<u64>,
    direction: Direction,
    cache: Option<Arc<EvaluationCache>>,
}

impl SearchControllerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses one of the built-in strategies with its default settings.
    #[must_use]
    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.factory = Some(Arc::new(move || kind.build()));
        self
    }

    /// Uses a custom-configured strategy. The factory runs once per model.
    #[must_use]
    pub fn strategy_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Sets the number of iterations per model.
    ///
    /// Default: 10.
    #[must_use]
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = Some(n_iter);
        self
    }

    /// Sets the seed every per-model seed is derived from.
    #[must_use]
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Sets the optimization direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Shorthand for `direction(Direction::Maximize)`.
    #[must_use]
    pub fn maximize(self) -> Self {
        self.direction(Direction::Maximize)
    }

    /// Shorthand for `direction(Direction::Minimize)`.
    #[must_use]
    pub fn minimize(self) -> Self {
        self.direction(Direction::Minimize)
    }

    /// Uses `cache` instead of a fresh in-memory cache.
    #[must_use]
    pub fn cache(self, cache: EvaluationCache) -> Self {
        self.shared_cache(Arc::new(cache))
    }

    /// Shares `cache` with other controllers.
    #[must_use]
    pub fn shared_cache(mut self, cache: Arc<EvaluationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the configured [`SearchController`].
    #[must_use]
    pub fn build(self) -> SearchController {
        let factory: StrategyFactory = match self.factory {
            Some(factory) => factory,
            None => Arc::new(|| StrategyKind::HillClimbing.build()),
        };
        let strategy_name = factory().name();
        SearchController {
            factory,
            strategy_name,
            n_iter: self.n_iter.unwrap_or(10),
            random_state: self.random_state.unwrap_or_else(|| fastrand::u64(..)),
            direction: self.direction,
            cache: self.cache.unwrap_or_default(),
        }
    }
}
