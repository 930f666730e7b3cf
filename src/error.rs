//! Error types for search-space construction, evaluation and caching.

use crate::space::Position;

/// Errors produced while building or running a search.
///
/// Every variant that can arise mid-run carries the model identifier and,
/// where meaningful, the iteration index and offending [`Position`], so a
/// failure can be reproduced by re-running with the same seed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a model's configuration cannot form a valid search space,
    /// or when an init specification does not match the declared space.
    #[error("invalid search space{}: {reason}", describe_model(model))]
    InvalidSearchSpace {
        /// The model whose configuration is invalid (empty if not yet known).
        model: String,
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Returned when a position outside the search-space bounds is decoded
    /// or proposed. This indicates a bug in a strategy and is never retried.
    #[error("invalid position {position}{}: {reason}", describe_model(model))]
    InvalidPosition {
        /// The model being searched (empty if not yet known).
        model: String,
        /// The offending position.
        position: Position,
        /// Why the position is invalid.
        reason: String,
    },

    /// Returned when the scoring function fails or yields a non-finite score.
    #[error(
        "evaluation failed for model '{model}' at iteration {iteration} (position {position}): {message}"
    )]
    Evaluation {
        /// The model being searched.
        model: String,
        /// The iteration at which the failure happened (0 is initialization).
        iteration: usize,
        /// The position whose evaluation failed.
        position: Position,
        /// The error reported by the scoring function.
        message: String,
        /// The per-iteration scores recorded before the failing iteration.
        history: Vec<f64>,
    },

    /// Returned when a cache entry references an out-of-line value that
    /// cannot be found or reconstructed.
    #[error("cache corruption for entry {key}: {reason}")]
    CacheCorruption {
        /// The cache key (or blob hash) that failed to resolve.
        key: String,
        /// What went wrong while dereferencing.
        reason: String,
    },

    /// Returned when a strategy name does not match any known strategy.
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    /// Returned when a durable cache operation fails.
    #[error("storage error: {0}")]
    Storage(String),

    /// Returned when an async task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

impl Error {
    /// Attach a model identifier to errors raised before the model was known.
    #[must_use]
    pub fn in_model(self, id: &str) -> Self {
        match self {
            Self::InvalidSearchSpace { model, reason } if model.is_empty() => {
                Self::InvalidSearchSpace {
                    model: id.to_owned(),
                    reason,
                }
            }
            Self::InvalidPosition {
                model,
                position,
                reason,
            } if model.is_empty() => Self::InvalidPosition {
                model: id.to_owned(),
                position,
                reason,
            },
            other => other,
        }
    }

    /// Attach the scores of the iterations that completed before an
    /// evaluation failure.
    pub(crate) fn with_history(self, scores: &[f64]) -> Self {
        match self {
            Self::Evaluation {
                model,
                iteration,
                position,
                message,
                ..
            } => Self::Evaluation {
                model,
                iteration,
                position,
                message,
                history: scores.to_vec(),
            },
            other => other,
        }
    }

    pub(crate) fn invalid_space(reason: impl Into<String>) -> Self {
        Self::InvalidSearchSpace {
            model: String::new(),
            reason: reason.into(),
        }
    }
}

fn describe_model(model: &str) -> String {
    if model.is_empty() {
        String::new()
    } else {
        format!(" for model '{model}'")
    }
}

/// Result alias with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
