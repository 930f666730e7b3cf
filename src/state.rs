//! Scored positions and the engine's running state.

use crate::space::Position;
use crate::types::Direction;

/// A position together with its raw score and its fitness.
///
/// `fitness` is the score in maximize orientation (see
/// [`Direction::fitness`]); every comparison inside the engine and the
/// strategies uses it.
#[derive(Clone, Debug, PartialEq)]
pub struct Scored {
    /// The evaluated position.
    pub position: Position,
    /// The raw objective score.
    pub score: f64,
    /// The score oriented so that larger is better.
    pub fitness: f64,
}

impl Scored {
    /// Pairs a position with its score under `direction`.
    #[must_use]
    pub fn new(position: Position, score: f64, direction: Direction) -> Self {
        Self {
            position,
            score,
            fitness: direction.fitness(score),
        }
    }

    /// `true` if `self` is at least as fit as `other`.
    #[must_use]
    pub fn not_worse_than(&self, other: &Self) -> bool {
        self.fitness >= other.fitness
    }
}

/// The current and best scored positions plus the iteration counter.
///
/// The best position only ever improves; ties go to the most recent
/// candidate.
#[derive(Clone, Debug)]
pub struct OptimizerState {
    current: Scored,
    best: Scored,
    iteration: usize,
}

impl OptimizerState {
    /// Seeds the state with the evaluated initial position.
    #[must_use]
    pub fn new(initial: Scored) -> Self {
        Self {
            best: initial.clone(),
            current: initial,
            iteration: 0,
        }
    }

    /// The position the strategy moves from.
    #[must_use]
    pub fn current(&self) -> &Scored {
        &self.current
    }

    /// The best position seen so far.
    #[must_use]
    pub fn best(&self) -> &Scored {
        &self.best
    }

    /// The number of completed iterations.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Moves the current position.
    pub fn set_current(&mut self, scored: Scored) {
        self.current = scored;
    }

    /// Replaces the best if `candidate` is not worse. Returns `true` if it did.
    pub fn offer_best(&mut self, candidate: &Scored) -> bool {
        if candidate.not_worse_than(&self.best) {
            self.best = candidate.clone();
            true
        } else {
            false
        }
    }

    pub(crate) fn advance(&mut self) {
        self.iteration += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(i: usize, score: f64) -> Scored {
        Scored::new(Position::new(vec![i]), score, Direction::Maximize)
    }

    #[test]
    fn test_best_never_regresses() {
        let mut state = OptimizerState::new(scored(0, 0.5));
        assert!(!state.offer_best(&scored(1, 0.4)));
        assert_eq!(state.best().score, 0.5);
        assert!(state.offer_best(&scored(2, 0.6)));
        assert_eq!(state.best().position, Position::new(vec![2]));
    }

    #[test]
    fn test_ties_prefer_the_newest() {
        let mut state = OptimizerState::new(scored(0, 0.5));
        assert!(state.offer_best(&scored(3, 0.5)));
        assert_eq!(state.best().position, Position::new(vec![3]));
    }

    #[test]
    fn test_minimize_orientation() {
        let low = Scored::new(Position::new(vec![0]), 1.0, Direction::Minimize);
        let high = Scored::new(Position::new(vec![1]), 2.0, Direction::Minimize);
        assert!(low.not_worse_than(&high));
        assert!(!high.not_worse_than(&low));
    }
}
