//! Core types shared across the search engine.

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Higher scores are better (the default).
    #[default]
    Maximize,
    /// Lower scores are better.
    Minimize,
}

impl Direction {
    /// Map a raw score to a fitness where larger is always better.
    #[must_use]
    pub fn fitness(self, score: f64) -> f64 {
        match self {
            Self::Maximize => score,
            Self::Minimize => -score,
        }
    }
}

/// Lifecycle phase of an [`OptimizerEngine`](crate::engine::OptimizerEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Search space built, initial position not yet evaluated.
    Init,
    /// Iterating; the initial position has been evaluated.
    Running,
    /// The iteration budget is exhausted.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_orientation() {
        assert_eq!(Direction::Maximize.fitness(0.8), 0.8);
        assert_eq!(Direction::Minimize.fitness(0.8), -0.8);
        assert_eq!(Direction::default(), Direction::Maximize);
    }

    #[test]
    fn test_direction_deserializes_lowercase() {
        let d: Direction = serde_json::from_str("\"minimize\"").unwrap();
        assert_eq!(d, Direction::Minimize);
    }
}
