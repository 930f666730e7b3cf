use std::sync::Arc;

use super::{SearchController, SearchReport, check_config};
use crate::config::{InitConfig, SearchConfig};
use crate::engine::SearchResult;
use crate::error::{Error, Result};

impl SearchController {
    /// Searches up to `concurrency` models at once.
    ///
    /// Each model's engine runs in [`spawn_blocking`](tokio::task::spawn_blocking)
    /// and results are collected through a [`JoinSet`](tokio::task::JoinSet).
    /// The report lists models in configuration order and every model sees
    /// the same seed as in [`search`](Self::search), so both produce the same
    /// results.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search), plus [`Error::TaskError`] if a
    /// blocking task panics or the semaphore is closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use hypersearch::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> hypersearch::Result<()> {
    /// let space = SearchSpace::new(vec![Dimension::range("k", 1..20)])?;
    /// let objective = |p: &ParameterAssignment, rows: &Vec<f64>| {
    ///     let k = p.get("k").and_then(ParamValue::as_f64).unwrap_or(1.0);
    ///     Ok::<_, String>(-(rows.len() as f64 - k).abs())
    /// };
    /// let config = SearchConfig::new().model("knn", space, objective);
    ///
    /// let report = SearchController::builder()
    ///     .n_iter(20)
    ///     .build()
    ///     .search_parallel(&config, &InitConfig::new(), Arc::new(vec![0.0; 8]), 4)
    ///     .await?;
    /// assert!(report.result("knn").is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search_parallel<D>(
        &self,
        config: &SearchConfig<D>,
        init: &InitConfig,
        data: Arc<D>,
        concurrency: usize,
    ) -> Result<SearchReport>
    where
        D: ?Sized + Send + Sync + 'static,
    {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "search_parallel",
            models = config.len(),
            concurrency,
            strategy = self.strategy_name
        )
        .entered();

        check_config(config, init)?;
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set: JoinSet<(usize, Result<SearchResult>)> = JoinSet::new();

        for (index, model) in config.models().iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::TaskError(e.to_string()))?;
            let controller = self.clone();
            let model = model.clone();
            let spec = init.get(model.id()).cloned();
            let data = Arc::clone(&data);
            join_set.spawn_blocking(move || {
                let outcome = controller.search_model(index, &model, spec, &*data);
                drop(permit);
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<SearchResult>>> =
            config.models().iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, outcome) = joined.map_err(|e| Error::TaskError(e.to_string()))?;
            slots[index] = Some(outcome);
        }
        trace_info!(models = slots.len(), "parallel search finished");

        let results = config
            .models()
            .iter()
            .zip(slots)
            .map(|(model, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    Err(Error::TaskError(format!("task for model '{}' never finished", model.id())))
                });
                (model.id().to_owned(), outcome)
            })
            .collect();
        Ok(SearchReport {
            direction: self.direction,
            results,
        })
    }
}
