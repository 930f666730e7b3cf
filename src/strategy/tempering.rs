//! Parallel tempering (replica exchange).

use super::{Strategy, local_move, metropolis, normalized_loss};
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// Runs `n_replicas` annealing walks at fixed temperatures on a geometric
/// ladder and periodically swaps adjacent replicas.
///
/// Replica 0 is the coldest and acts as the engine's current position.
/// Every `swap_every` iterations each adjacent pair `(i, i + 1)` swaps
/// positions with probability `min(1, exp((β_i - β_j)(E_i - E_j)))`, where
/// `β = 1 / T` and `E` is the negated fitness normalized over the replicas.
#[derive(Clone, Debug)]
pub struct ParallelTempering {
    n_replicas: usize,
    swap_every: usize,
    t_min: f64,
    t_max: f64,
    replicas: Vec<Scored>,
    temperatures: Vec<f64>,
}

impl ParallelTempering {
    /// Creates 5 replicas between `T = 0.01` and `T = 1.0`, swapping every 5
    /// iterations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_replicas: 5,
            swap_every: 5,
            t_min: 0.01,
            t_max: 1.0,
            replicas: Vec::new(),
            temperatures: Vec::new(),
        }
    }

    /// Sets the number of replicas (at least 1).
    #[must_use]
    pub fn n_replicas(mut self, n: usize) -> Self {
        self.n_replicas = n.max(1);
        self
    }

    /// Sets the swap period in iterations (at least 1).
    #[must_use]
    pub fn swap_every(mut self, m: usize) -> Self {
        self.swap_every = m.max(1);
        self
    }

    /// Sets the coldest and hottest ladder temperatures.
    #[must_use]
    pub fn temperature_range(mut self, t_min: f64, t_max: f64) -> Self {
        let lo = t_min.min(t_max).max(f64::MIN_POSITIVE);
        self.t_min = lo;
        self.t_max = t_max.max(t_min).max(lo);
        self
    }

    /// The temperature ladder, coldest first.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ladder(&self) -> Vec<f64> {
        if self.n_replicas == 1 {
            return vec![self.t_min];
        }
        let ratio = self.t_max / self.t_min;
        let steps = (self.n_replicas - 1) as f64;
        (0..self.n_replicas)
            .map(|i| self.t_min * ratio.powf(i as f64 / steps))
            .collect()
    }

    /// The replicas' current positions, coldest first.
    #[must_use]
    pub fn replicas(&self) -> &[Scored] {
        &self.replicas
    }

    fn swap_adjacent(&mut self, rng: &mut fastrand::Rng) {
        let (lo, hi) = self
            .replicas
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r.fitness), hi.max(r.fitness))
            });
        let range = hi - lo;
        let energy = |r: &Scored| {
            if range > 0.0 {
                -(r.fitness - lo) / range
            } else {
                0.0
            }
        };
        for i in 0..self.replicas.len().saturating_sub(1) {
            let j = i + 1;
            let beta_i = 1.0 / self.temperatures[i];
            let beta_j = 1.0 / self.temperatures[j];
            let log_p = (beta_i - beta_j) * (energy(&self.replicas[i]) - energy(&self.replicas[j]));
            if log_p >= 0.0 || rng.f64() < log_p.exp() {
                self.replicas.swap(i, j);
                trace_debug!(i, j, "replicas swapped");
            }
        }
    }
}

impl Default for ParallelTempering {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ParallelTempering {
    fn name(&self) -> &'static str {
        "ParallelTempering"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        if self.replicas.is_empty() {
            self.temperatures = self.ladder();
            let mut seeds = Vec::with_capacity(self.n_replicas);
            seeds.push(local_move(&state.current().position, space, 1, rng));
            for _ in 1..self.n_replicas {
                seeds.push(space.random_position(rng));
            }
            return seeds;
        }
        self.replicas
            .iter()
            .map(|r| local_move(&r.position, space, 1, rng))
            .collect()
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        rng: &mut fastrand::Rng,
    ) {
        if self.replicas.is_empty() {
            let mut seeded = evaluated.to_vec();
            if let Some(first) = seeded.first_mut() {
                let delta = normalized_loss(state.current().fitness, first.fitness);
                if delta > 0.0 && !metropolis(delta, self.temperatures[0], rng) {
                    *first = state.current().clone();
                }
            }
            self.replicas = seeded;
        } else {
            for ((replica, candidate), &t) in self
                .replicas
                .iter_mut()
                .zip(evaluated)
                .zip(&self.temperatures)
            {
                let delta = normalized_loss(replica.fitness, candidate.fitness);
                if delta <= 0.0 || metropolis(delta, t, rng) {
                    *replica = candidate.clone();
                }
            }
        }
        if let Some(coldest) = self.replicas.first() {
            state.set_current(coldest.clone());
        }
    }

    fn coordinate(&mut self, state: &mut OptimizerState, rng: &mut fastrand::Rng) {
        if state.iteration() % self.swap_every != 0 || self.replicas.len() < 2 {
            return;
        }
        self.swap_adjacent(rng);
        if let Some(coldest) = self.replicas.first() {
            state.set_current(coldest.clone());
        }
    }
}
