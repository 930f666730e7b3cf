//! Multi-model search orchestration.
//!
//! A [`SearchController`] runs one [`OptimizerEngine`] per configured model,
//! sharing a single [`EvaluationCache`]. Each model gets its own seed
//! derived from the controller's `random_state` and the model's position in
//! the configuration, so adding models never changes the others' runs.
//! A failing model records its error in the [`SearchReport`] and the
//! remaining models still run.
//!
//! ```
//! use hypersearch::prelude::*;
//!
//! let space = || SearchSpace::new(vec![Dimension::range("n", 1..40)]).unwrap();
//! let config = SearchConfig::new()
//!     .model("low", space(), |p: &ParameterAssignment, _: &()| {
//!         Ok::<_, String>(-(p.get("n").and_then(ParamValue::as_f64).unwrap_or(0.0) - 5.0).abs())
//!     })
//!     .model("broken", space(), |_: &ParameterAssignment, _: &()| Err("no data"));
//!
//! let report = SearchController::builder()
//!     .strategy(StrategyKind::RandomRestartHillClimbing)
//!     .n_iter(60)
//!     .random_state(1)
//!     .build()
//!     .search(&config, &InitConfig::new(), &())
//!     .unwrap();
//!
//! assert!(report.best_score("low").unwrap() >= -2.0);
//! assert!(report.error("broken").is_some());
//! ```

mod builder;
#[cfg(feature = "async")]
mod parallel;
mod report;

use std::collections::HashSet;
use std::sync::Arc;

pub use builder::SearchControllerBuilder;
pub use report::SearchReport;

use crate::cache::EvaluationCache;
use crate::config::{InitConfig, InitSpec, ModelConfig, SearchConfig};
use crate::engine::{OptimizerEngine, SearchResult};
use crate::error::{Error, Result};
use crate::rng_util::splitmix64;
use crate::strategy::Strategy;
use crate::types::Direction;

/// Produces a fresh strategy for each model.
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Runs one strategy over every model of a [`SearchConfig`].
#[derive(Clone)]
pub struct SearchController {
    factory: StrategyFactory,
    strategy_name: &'static str,
    n_iter: usize,
    random_state: u64,
    direction: Direction,
    cache: Arc<EvaluationCache>,
}

impl SearchController {
    /// Creates a builder for configuring a `SearchController`.
    #[must_use]
    pub fn builder() -> SearchControllerBuilder {
        SearchControllerBuilder::new()
    }

    /// The name of the strategy every model is searched with.
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy_name
    }

    /// The number of iterations per model.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// The seed per-model seeds are derived from.
    #[must_use]
    pub fn random_state(&self) -> u64 {
        self.random_state
    }

    /// The optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The cache shared by every model.
    #[must_use]
    pub fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }

    /// Searches every model in configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSearchSpace`] if two models share an
    /// identifier or `init` names a model that is not configured. Errors of
    /// individual models are recorded in the report instead.
    pub fn search<D>(
        &self,
        config: &SearchConfig<D>,
        init: &InitConfig,
        data: &D,
    ) -> Result<SearchReport>
    where
        D: ?Sized + Sync + 'static,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "search",
            models = config.len(),
            strategy = self.strategy_name,
            n_iter = self.n_iter,
            direction = ?self.direction
        )
        .entered();

        check_config(config, init)?;
        let results = config
            .models()
            .iter()
            .enumerate()
            .map(|(index, model)| {
                let outcome = self.search_model(index, model, init.get(model.id()).cloned(), data);
                (model.id().to_owned(), outcome)
            })
            .collect();
        Ok(SearchReport {
            direction: self.direction,
            results,
        })
    }

    fn model_seed(&self, index: usize) -> u64 {
        splitmix64(self.random_state.wrapping_add(index as u64))
    }

    fn search_model<D>(
        &self,
        index: usize,
        model: &ModelConfig<D>,
        init: Option<InitSpec>,
        data: &D,
    ) -> Result<SearchResult>
    where
        D: ?Sized + Sync,
    {
        let outcome = OptimizerEngine::new(
            model,
            data,
            &self.cache,
            (self.factory)(),
            self.model_seed(index),
        )
        .direction(self.direction)
        .n_iter(self.n_iter)
        .init(init)
        .run();
        #[cfg(feature = "tracing")]
        if let Err(e) = &outcome {
            tracing::warn!(model = model.id(), error = %e, "model search failed");
        }
        outcome
    }
}

impl core::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SearchController")
            .field("strategy", &self.strategy_name)
            .field("n_iter", &self.n_iter)
            .field("random_state", &self.random_state)
            .field("direction", &self.direction)
            .field("cache", &self.cache)
            .finish()
    }
}

fn check_config<D: ?Sized + 'static>(config: &SearchConfig<D>, init: &InitConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for model in config.models() {
        if !seen.insert(model.id()) {
            return Err(Error::InvalidSearchSpace {
                model: model.id().to_owned(),
                reason: "model identifier is configured more than once".to_owned(),
            });
        }
    }
    if let Some(unknown) = init.model_ids().find(|id| !seen.contains(id)) {
        return Err(Error::InvalidSearchSpace {
            model: unknown.to_owned(),
            reason: "init config names a model that is not configured".to_owned(),
        });
    }
    Ok(())
}
