//! Hill climbing and its stochastic and restarting variants.

use super::{Strategy, local_move};
use crate::rng_util;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// Moves one random dimension by `step` and keeps the move if it is not worse.
#[derive(Clone, Debug)]
pub struct HillClimbing {
    step: usize,
}

impl HillClimbing {
    /// Creates a hill climber with a step of one index.
    #[must_use]
    pub fn new() -> Self {
        Self { step: 1 }
    }

    /// Sets the move size in indices (at least 1).
    #[must_use]
    pub fn step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }
}

impl Default for HillClimbing {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for HillClimbing {
    fn name(&self) -> &'static str {
        "HillClimbing"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        vec![local_move(&state.current().position, space, self.step, rng)]
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

/// Hill climbing that also takes a worse move with probability `p`.
#[derive(Clone, Debug)]
pub struct StochasticHillClimbing {
    step: usize,
    p: f64,
}

impl StochasticHillClimbing {
    /// Creates a stochastic hill climber with `p = 0.1`.
    #[must_use]
    pub fn new() -> Self {
        Self { step: 1, p: 0.1 }
    }

    /// Sets the move size in indices (at least 1).
    #[must_use]
    pub fn step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    /// Sets the probability of accepting a worse move, clamped to `[0, 1]`.
    #[must_use]
    pub fn p_accept(mut self, p: f64) -> Self {
        self.p = p.clamp(0.0, 1.0);
        self
    }
}

impl Default for StochasticHillClimbing {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for StochasticHillClimbing {
    fn name(&self) -> &'static str {
        "StochasticHillClimbing"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        vec![local_move(&state.current().position, space, self.step, rng)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            if candidate.not_worse_than(state.current()) || rng_util::chance(rng, self.p) {
                state.set_current(candidate.clone());
            }
        }
    }
}

/// Hill climbing that jumps to a random position after `patience`
/// iterations without improving the current position.
///
/// The jump is accepted unconditionally. The global best is kept by the
/// engine and never reset.
#[derive(Clone, Debug)]
pub struct RandomRestartHillClimbing {
    step: usize,
    patience: usize,
    stale: usize,
    restarting: bool,
}

impl RandomRestartHillClimbing {
    /// Creates a restarting hill climber with a patience of 10 iterations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: 1,
            patience: 10,
            stale: 0,
            restarting: false,
        }
    }

    /// Sets the move size in indices (at least 1).
    #[must_use]
    pub fn step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    /// Sets how many non-improving iterations trigger a restart (at least 1).
    #[must_use]
    pub fn patience(mut self, patience: usize) -> Self {
        self.patience = patience.max(1);
        self
    }
}

impl Default for RandomRestartHillClimbing {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomRestartHillClimbing {
    fn name(&self) -> &'static str {
        "RandomRestartHillClimbing"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        self.restarting = self.stale >= self.patience;
        if self.restarting {
            vec![space.random_position(rng)]
        } else {
            vec![local_move(&state.current().position, space, self.step, rng)]
        }
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            if self.restarting {
                trace_debug!(
                    iteration = state.iteration() + 1,
                    score = candidate.score,
                    "hill climber restarted"
                );
                state.set_current(candidate.clone());
                self.stale = 0;
                self.restarting = false;
            } else {
                if candidate.fitness > state.current().fitness {
                    self.stale = 0;
                } else {
                    self.stale += 1;
                }
                if candidate.not_worse_than(state.current()) {
                    state.set_current(candidate.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, scored, space, state_at};
    use super::*;

    #[test]
    fn test_hill_climbing_reaches_peak() {
        let space = space();
        let mut state = state_at(vec![0, 0, 0]);
        let mut rng = fastrand::Rng::with_seed(1);
        drive(&mut HillClimbing::new(), &space, &mut state, 400, &mut rng);
        assert_eq!(state.best().position, Position::new(vec![15, 5, 2]));
        assert_eq!(state.best().score, 0.0);
    }

    #[test]
    fn test_hill_climbing_never_accepts_worse() {
        let mut strategy = HillClimbing::new();
        let mut state = state_at(vec![15, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(0);
        strategy.accept(&mut state, &[scored(Position::new(vec![14, 5, 2]))], &mut rng);
        assert_eq!(state.current().position, Position::new(vec![15, 5, 2]));
    }

    #[test]
    fn test_hill_climbing_accepts_equal() {
        let mut strategy = HillClimbing::new();
        let mut state = state_at(vec![14, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(0);
        strategy.accept(&mut state, &[scored(Position::new(vec![16, 5, 2]))], &mut rng);
        assert_eq!(state.current().position, Position::new(vec![16, 5, 2]));
    }

    #[test]
    fn test_stochastic_accepts_worse_with_p_one() {
        let mut strategy = StochasticHillClimbing::new().p_accept(1.0);
        let mut state = state_at(vec![15, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(0);
        strategy.accept(&mut state, &[scored(Position::new(vec![0, 0, 0]))], &mut rng);
        assert_eq!(state.current().position, Position::new(vec![0, 0, 0]));
    }

    #[test]
    fn test_restart_after_patience() {
        let space = space();
        let mut strategy = RandomRestartHillClimbing::new().patience(2);
        let mut state = state_at(vec![15, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(4);
        for _ in 0..2 {
            let p = strategy.propose(&state, &space, &mut rng);
            strategy.accept(&mut state, &[scored(p[0].clone())], &mut rng);
        }
        assert_eq!(strategy.stale, 2);
        let p = strategy.propose(&state, &space, &mut rng);
        assert!(strategy.restarting);
        strategy.accept(&mut state, &[scored(p[0].clone())], &mut rng);
        assert_eq!(state.current().position, p[0]);
        assert_eq!(strategy.stale, 0);
    }
}
