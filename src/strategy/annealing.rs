//! Simulated annealing and stochastic tunneling.
//!
//! Both take a single ±1 step per iteration and accept worse moves with the
//! Metropolis probability `exp(-Δ / T)`. They differ in the energy `Δ` is
//! measured on. The temperature follows a [`GeometricCooling`] schedule.

use super::{Strategy, local_move, metropolis, normalized_loss};
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// A geometric cooling schedule: `T_{k+1} = T_k * alpha`.
///
/// Below `min_temp` the schedule is frozen and no worse move is accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometricCooling {
    initial: f64,
    current: f64,
    alpha: f64,
    min_temp: f64,
}

impl GeometricCooling {
    /// Creates a schedule starting at `initial`.
    ///
    /// `alpha` is clamped into `(0, 1]` and `initial` to be non-negative.
    #[must_use]
    pub fn new(initial: f64, alpha: f64, min_temp: f64) -> Self {
        let initial = initial.max(0.0);
        Self {
            initial,
            current: initial,
            alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0),
            min_temp: min_temp.max(0.0),
        }
    }

    /// Restarts the schedule at its initial temperature.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Cools by one step.
    pub fn update(&mut self) {
        if !self.is_frozen() {
            self.current *= self.alpha;
        }
    }

    /// The current temperature.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Returns `true` once the temperature fell below the minimum.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.current < self.min_temp
    }

    fn with_initial(mut self, initial: f64) -> Self {
        self.initial = initial.max(0.0);
        self.current = self.initial;
        self
    }

    fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    fn with_min(mut self, min_temp: f64) -> Self {
        self.min_temp = min_temp.max(0.0);
        self
    }
}

impl Default for GeometricCooling {
    fn default() -> Self {
        Self::new(1.0, 0.97, 1e-8)
    }
}

/// Accept rule shared by both annealers: not worse always, worse with the
/// Metropolis probability unless frozen.
fn anneal_accept(delta: f64, cooling: &GeometricCooling, rng: &mut fastrand::Rng) -> bool {
    delta <= 0.0 || (!cooling.is_frozen() && metropolis(delta, cooling.current(), rng))
}

/// Simulated annealing over normalized fitness loss.
///
/// For a candidate worse than the current position the loss is
/// `(f_cur - f_cand) / (|f_cur| + |f_cand|)`, which makes the temperature
/// independent of the score's scale.
#[derive(Clone, Debug)]
pub struct SimulatedAnnealing {
    cooling: GeometricCooling,
}

impl SimulatedAnnealing {
    /// Creates an annealer with `T0 = 1.0`, `alpha = 0.97`, `t_min = 1e-8`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cooling: GeometricCooling::default(),
        }
    }

    /// Sets the starting temperature.
    #[must_use]
    pub fn initial_temperature(mut self, t0: f64) -> Self {
        self.cooling = self.cooling.with_initial(t0);
        self
    }

    /// Sets the cooling factor applied every iteration.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.cooling = self.cooling.with_alpha(alpha);
        self
    }

    /// Sets the temperature below which only improving moves are accepted.
    #[must_use]
    pub fn min_temperature(mut self, t_min: f64) -> Self {
        self.cooling = self.cooling.with_min(t_min);
        self
    }

    /// Uses a custom cooling schedule.
    #[must_use]
    pub fn cooling(mut self, cooling: GeometricCooling) -> Self {
        self.cooling = cooling;
        self
    }

    /// The current temperature.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.cooling.current()
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "SimulatedAnnealing"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        vec![local_move(&state.current().position, space, 1, rng)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            let delta = normalized_loss(state.current().fitness, candidate.fitness);
            if anneal_accept(delta, &self.cooling, rng) {
                state.set_current(candidate.clone());
            }
        }
        self.cooling.update();
    }
}

/// Stochastic tunneling: annealing on the transformed energy
/// `E_stun(f) = 1 - exp(-gamma * (f_best - f))`.
///
/// The transform flattens the landscape above the best fitness found so
/// far, so the walk tunnels through barriers between basins.
#[derive(Clone, Debug)]
pub struct StochasticTunneling {
    gamma: f64,
    cooling: GeometricCooling,
}

impl StochasticTunneling {
    /// Creates a tunneler with `gamma = 1.0`, `T0 = 1.0`, `alpha = 0.97`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gamma: 1.0,
            cooling: GeometricCooling::default(),
        }
    }

    /// Sets the tunneling strength.
    #[must_use]
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.max(0.0);
        self
    }

    /// Sets the starting temperature.
    #[must_use]
    pub fn initial_temperature(mut self, t0: f64) -> Self {
        self.cooling = self.cooling.with_initial(t0);
        self
    }

    /// Sets the cooling factor applied every iteration.
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.cooling = self.cooling.with_alpha(alpha);
        self
    }

    /// Uses a custom cooling schedule.
    #[must_use]
    pub fn cooling(mut self, cooling: GeometricCooling) -> Self {
        self.cooling = cooling;
        self
    }

    /// The tunneling energy of fitness `f` relative to `f_best`.
    #[must_use]
    pub fn energy(&self, f_best: f64, f: f64) -> f64 {
        1.0 - (-self.gamma * (f_best - f)).exp()
    }
}

impl Default for StochasticTunneling {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for StochasticTunneling {
    fn name(&self) -> &'static str {
        "StochasticTunneling"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        vec![local_move(&state.current().position, space, 1, rng)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            let f_best = state.best().fitness.max(candidate.fitness);
            let e_cur = self.energy(f_best, state.current().fitness);
            let e_cand = self.energy(f_best, candidate.fitness);
            if anneal_accept(e_cand - e_cur, &self.cooling, rng) {
                state.set_current(candidate.clone());
            }
        }
        self.cooling.update();
    }
}
