use crate::engine::SearchResult;
use crate::error::{Error, Result};
use crate::space::ParameterAssignment;
use crate::types::Direction;

/// Per-model outcomes of one [`SearchController`](super::SearchController) run,
/// in configuration order.
#[derive(Debug)]
pub struct SearchReport {
    pub(crate) direction: Direction,
    pub(crate) results: Vec<(String, Result<SearchResult>)>,
}

impl SearchReport {
    /// The outcome for `model`, if it was configured.
    #[must_use]
    pub fn outcome(&self, model: &str) -> Option<&Result<SearchResult>> {
        self.results
            .iter()
            .find(|(id, _)| id == model)
            .map(|(_, outcome)| outcome)
    }

    /// The result for `model`, if its search succeeded.
    #[must_use]
    pub fn result(&self, model: &str) -> Option<&SearchResult> {
        self.outcome(model).and_then(|o| o.as_ref().ok())
    }

    /// The error for `model`, if its search failed.
    #[must_use]
    pub fn error(&self, model: &str) -> Option<&Error> {
        self.outcome(model).and_then(|o| o.as_ref().err())
    }

    /// The best assignment found for `model`.
    #[must_use]
    pub fn best_params(&self, model: &str) -> Option<&ParameterAssignment> {
        self.result(model).map(|r| &r.best_params)
    }

    /// The best score found for `model`.
    #[must_use]
    pub fn best_score(&self, model: &str) -> Option<f64> {
        self.result(model).map(|r| r.best_score)
    }

    /// Every failed model with its error.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.results
            .iter()
            .filter_map(|(id, o)| o.as_ref().err().map(|e| (id.as_str(), e)))
    }

    /// Every successful result.
    pub fn successes(&self) -> impl Iterator<Item = &SearchResult> {
        self.results.iter().filter_map(|(_, o)| o.as_ref().ok())
    }

    /// All outcomes in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<SearchResult>)> {
        self.results.iter().map(|(id, o)| (id.as_str(), o))
    }

    /// The successful result with the best score across all models. Later
    /// models win ties.
    #[must_use]
    pub fn best_overall(&self) -> Option<&SearchResult> {
        let fitness = |r: &SearchResult| self.direction.fitness(r.best_score);
        self.successes().fold(None, |best: Option<&SearchResult>, r| match best {
            Some(b) if fitness(b) > fitness(r) => Some(b),
            _ => Some(r),
        })
    }

    /// The number of configured models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no models were configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consumes the report, yielding the outcomes in configuration order.
    #[must_use]
    pub fn into_results(self) -> Vec<(String, Result<SearchResult>)> {
        self.results
    }
}

impl<'a> IntoIterator for &'a SearchReport {
    type Item = (&'a str, &'a Result<SearchResult>);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
