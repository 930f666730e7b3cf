//! Random search and random annealing.

use super::Strategy;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// Evaluates a uniformly random position every iteration.
#[derive(Clone, Debug, Default)]
pub struct RandomSearch;

impl RandomSearch {
    /// Creates a random search.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RandomSearch {
    fn name(&self) -> &'static str {
        "RandomSearch"
    }

    fn propose(
        &mut self,
        _state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        vec![space.random_position(rng)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        if let Some(last) = evaluated.last() {
            state.set_current(last.clone());
        }
    }
}

/// Offsets every dimension uniformly within a radius that shrinks
/// geometrically with the iteration count.
///
/// At iteration `k` the radius of a dimension with `len` candidates is
/// `max(1, round(len * start_radius * decay^k))`. Moves that are not worse
/// are accepted.
#[derive(Clone, Debug)]
pub struct RandomAnnealing {
    start_radius: f64,
    decay: f64,
}

impl RandomAnnealing {
    /// Creates a random annealer with `start_radius = 0.3` and `decay = 0.97`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_radius: 0.3,
            decay: 0.97,
        }
    }

    /// Sets the initial radius as a fraction of each dimension's length.
    #[must_use]
    pub fn start_radius(mut self, fraction: f64) -> Self {
        self.start_radius = fraction.max(0.0);
        self
    }

    /// Sets the per-iteration radius decay factor, clamped to `(0, 1]`.
    #[must_use]
    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    /// The radius used for a dimension of `len` candidates at iteration `k`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn radius(&self, len: usize, k: usize) -> usize {
        let exponent = i32::try_from(k).unwrap_or(i32::MAX);
        let r = (len as f64 * self.start_radius * self.decay.powi(exponent)).round();
        (r as usize).max(1)
    }
}

impl Default for RandomAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomAnnealing {
    fn name(&self) -> &'static str {
        "RandomAnnealing"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        let k = state.iteration();
        let from = &state.current().position;
        let indices = space
            .dimensions()
            .iter()
            .zip(from.iter())
            .map(|(dim, &i)| {
                let r = self.radius(dim.len(), k);
                let lo = i.saturating_sub(r);
                let hi = (i + r).min(dim.max_index());
                rng.usize(lo..=hi)
            })
            .collect();
        vec![Position::new(indices)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            if candidate.not_worse_than(state.current()) {
                state.set_current(candidate.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, space, state_at};
    use super::*;

    #[test]
    fn test_random_search_always_moves() {
        let space = space();
        let mut state = state_at(vec![15, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(3);
        drive(&mut RandomSearch::new(), &space, &mut state, 1, &mut rng);
        assert_eq!(state.best().position, Position::new(vec![15, 5, 2]));
        assert_eq!(state.iteration(), 1);
    }

    #[test]
    fn test_radius_shrinks_to_one() {
        let ra = RandomAnnealing::new();
        assert_eq!(ra.radius(50, 0), 15);
        assert!(ra.radius(50, 10) < 15);
        assert_eq!(ra.radius(50, 1_000), 1);
        assert_eq!(ra.radius(1, 0), 1);
    }

    #[test]
    fn test_offsets_stay_within_radius() {
        let space = space();
        let mut ra = RandomAnnealing::new();
        let state = state_at(vec![10, 10, 1]);
        let mut rng = fastrand::Rng::with_seed(6);
        for _ in 0..100 {
            let p = ra.propose(&state, &space, &mut rng).remove(0);
            assert!(space.contains(&p));
            assert!(p[0].abs_diff(10) <= 6);
            assert!(p[2].abs_diff(1) <= 1);
        }
    }

    #[test]
    fn test_random_annealing_improves() {
        let space = space();
        let mut state = state_at(vec![0, 19, 0]);
        let start = state.best().score;
        let mut rng = fastrand::Rng::with_seed(12);
        drive(&mut RandomAnnealing::new(), &space, &mut state, 150, &mut rng);
        assert!(state.best().score > start);
    }
}
