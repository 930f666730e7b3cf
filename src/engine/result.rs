use serde::Serialize;

use crate::space::{ParameterAssignment, Position};

/// The frozen outcome of one model's search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    /// The model identifier.
    pub model: String,
    /// The name of the strategy that produced this result.
    pub strategy: &'static str,
    /// The best assignment found.
    pub best_params: ParameterAssignment,
    /// The position of the best assignment.
    pub best_position: Position,
    /// The best score, in the objective's own orientation.
    pub best_score: f64,
    /// The score of the initial position.
    pub initial_score: f64,
    /// One entry per iteration: the best score among that iteration's candidates.
    pub history: Vec<f64>,
    /// One entry per iteration: the global best score after that iteration.
    pub best_history: Vec<f64>,
    /// How many times the objective was invoked.
    pub n_evaluations: usize,
    /// How many candidate scores came from the cache.
    pub n_cache_hits: usize,
}

impl SearchResult {
    /// The number of completed iterations.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.history.len()
    }

    /// Serializes the result as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::Storage(e.to_string()))
    }
}

/// Progress of one finished iteration, passed to the engine's callback.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport<'a> {
    /// The model being searched.
    pub model: &'a str,
    /// The 1-based iteration index.
    pub iteration: usize,
    /// The best score among this iteration's candidates.
    pub score: f64,
    /// The global best score after this iteration.
    pub best_score: f64,
    /// Whether this iteration changed the global best.
    pub improved: bool,
}
