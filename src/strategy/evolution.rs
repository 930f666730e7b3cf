//! (μ, λ) evolution strategy.

use super::{Strategy, local_move};
use crate::rng_util;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// Breeds `lambda` offspring from `mu` parents every iteration.
///
/// Each child copies a random parent, or with probability `crossover_rate`
/// takes every gene from one of two random parents. Each gene then mutates
/// with probability `mutation_rate` by a Gaussian offset of standard
/// deviation `sigma * len`, and at least one gene always mutates. Selection
/// at the barrier keeps the top `mu` offspring; parents never survive.
#[derive(Clone, Debug)]
pub struct EvolutionStrategy {
    lambda: usize,
    mu: usize,
    mutation_rate: f64,
    crossover_rate: f64,
    sigma: f64,
    parents: Vec<Scored>,
    offspring: Vec<Scored>,
}

impl EvolutionStrategy {
    /// Creates a (3, 10) strategy with mutation 0.7, crossover 0.3 and
    /// `sigma = 0.1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lambda: 10,
            mu: 3,
            mutation_rate: 0.7,
            crossover_rate: 0.3,
            sigma: 0.1,
            parents: Vec::new(),
            offspring: Vec::new(),
        }
    }

    /// Sets the number of offspring per generation (at least 1).
    #[must_use]
    pub fn lambda(mut self, lambda: usize) -> Self {
        self.lambda = lambda.max(1);
        self.mu = self.mu.min(self.lambda);
        self
    }

    /// Sets the number of parents kept by selection (between 1 and `lambda`).
    #[must_use]
    pub fn mu(mut self, mu: usize) -> Self {
        self.mu = mu.clamp(1, self.lambda);
        self
    }

    /// Sets the per-gene mutation probability.
    #[must_use]
    pub fn mutation_rate(mut self, p: f64) -> Self {
        self.mutation_rate = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the probability of breeding from two parents.
    #[must_use]
    pub fn crossover_rate(mut self, p: f64) -> Self {
        self.crossover_rate = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation scale as a fraction of each dimension's length.
    #[must_use]
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma.max(0.0);
        self
    }

    /// The current parents, fittest first.
    #[must_use]
    pub fn parents(&self) -> &[Scored] {
        &self.parents
    }

    fn breed(&self, space: &SearchSpace, rng: &mut fastrand::Rng) -> Position {
        let a = &self.parents[rng.usize(0..self.parents.len())].position;
        let mut genes = a.clone().into_inner();
        if self.parents.len() > 1 && rng_util::chance(rng, self.crossover_rate) {
            let b = &self.parents[rng.usize(0..self.parents.len())].position;
            for (gene, &other) in genes.iter_mut().zip(b.iter()) {
                if rng.bool() {
                    *gene = other;
                }
            }
        }
        let mut mutated = false;
        for (d, gene) in genes.iter_mut().enumerate() {
            if rng_util::chance(rng, self.mutation_rate) {
                *gene = self.mutate_gene(*gene, d, space, rng);
                mutated = true;
            }
        }
        let child = Position::new(genes);
        if mutated && child != *a {
            child
        } else {
            local_move(&child, space, self.step_size(space, rng), rng)
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn mutate_gene(
        &self,
        gene: usize,
        d: usize,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let dim = &space.dimensions()[d];
        let offset = (rng_util::standard_normal(rng) * self.sigma * dim.len() as f64).round();
        let next = (gene as f64 + offset).clamp(0.0, dim.max_index() as f64);
        next as usize
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn step_size(&self, space: &SearchSpace, rng: &mut fastrand::Rng) -> usize {
        let widest = space.dimensions().iter().map(|d| d.len()).max().unwrap_or(1);
        let scale = self.sigma * widest as f64;
        (rng_util::standard_normal(rng).abs() * scale).round().max(1.0) as usize
    }
}

impl Default for EvolutionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for EvolutionStrategy {
    fn name(&self) -> &'static str {
        "EvolutionStrategy"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        if self.parents.is_empty() {
            let mut seeds = Vec::with_capacity(self.lambda);
            seeds.push(local_move(&state.current().position, space, 1, rng));
            for _ in 1..self.lambda {
                seeds.push(space.random_position(rng));
            }
            return seeds;
        }
        (0..self.lambda).map(|_| self.breed(space, rng)).collect()
    }

    fn accept(
        &mut self,
        _state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        self.offspring = evaluated.to_vec();
    }

    fn coordinate(&mut self, state: &mut OptimizerState, _rng: &mut fastrand::Rng) {
        let mut ranked: Vec<(usize, Scored)> = core::mem::take(&mut self.offspring)
            .into_iter()
            .enumerate()
            .collect();
        // Fittest first; among equals the later offspring ranks higher.
        ranked.sort_by(|(ia, a), (ib, b)| b.fitness.total_cmp(&a.fitness).then(ib.cmp(ia)));
        ranked.truncate(self.mu);
        self.parents = ranked.into_iter().map(|(_, s)| s).collect();
        if let Some(fittest) = self.parents.first() {
            state.set_current(fittest.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, scored, space, state_at};
    use super::*;

    #[test]
    fn test_selection_keeps_top_mu_offspring() {
        let mut es = EvolutionStrategy::new().lambda(4).mu(2);
        let mut state = state_at(vec![0, 0, 0]);
        let mut rng = fastrand::Rng::with_seed(0);
        let offspring = [
            scored(Position::new(vec![1, 1, 1])),
            scored(Position::new(vec![15, 5, 2])),
            scored(Position::new(vec![14, 5, 2])),
            scored(Position::new(vec![0, 0, 0])),
        ];
        es.accept(&mut state, &offspring, &mut rng);
        es.coordinate(&mut state, &mut rng);
        let kept: Vec<&Position> = es.parents().iter().map(|s| &s.position).collect();
        assert_eq!(kept, vec![&offspring[1].position, &offspring[2].position]);
        assert_eq!(state.current().position, offspring[1].position);
    }

    #[test]
    fn test_children_differ_from_a_single_parent() {
        let space = space();
        let mut es = EvolutionStrategy::new().mu(1).crossover_rate(0.0);
        es.parents = vec![scored(Position::new(vec![10, 10, 1]))];
        let mut rng = fastrand::Rng::with_seed(17);
        for _ in 0..100 {
            let child = es.breed(&space, &mut rng);
            assert!(space.contains(&child));
            assert_ne!(child, Position::new(vec![10, 10, 1]));
        }
    }

    #[test]
    fn test_offspring_count_is_lambda() {
        let space = space();
        let mut es = EvolutionStrategy::new().lambda(7).mu(2);
        let mut state = state_at(vec![0, 0, 0]);
        let mut rng = fastrand::Rng::with_seed(9);
        drive(&mut es, &space, &mut state, 3, &mut rng);
        assert_eq!(es.parents().len(), 2);
        assert_eq!(es.propose(&state, &space, &mut rng).len(), 7);
    }

    #[test]
    fn test_evolution_improves() {
        let space = space();
        let mut state = state_at(vec![0, 19, 0]);
        let start = state.best().score;
        let mut rng = fastrand::Rng::with_seed(31);
        drive(&mut EvolutionStrategy::new(), &space, &mut state, 20, &mut rng);
        assert!(state.best().score > start);
    }
}
