//! Particle swarm optimization over integer positions.

use super::{Strategy, fittest, local_move};
use crate::rng_util;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

#[derive(Clone, Debug)]
struct Particle {
    position: Position,
    velocity: Vec<f64>,
    personal_best: Scored,
}

/// A swarm of particles pulled towards their personal bests and the swarm
/// best.
///
/// Velocity update per dimension:
/// `v ← w·v + c_k·r1·(p_best − x) + c_s·r2·(g − x)`, clamped to the
/// dimension length, then `x ← round(x + v)` clamped to the bounds. The
/// swarm best `g` is read from a snapshot taken when the step is proposed
/// and only updated at the barrier.
#[derive(Clone, Debug)]
pub struct ParticleSwarm {
    n_particles: usize,
    inertia: f64,
    cognitive: f64,
    social: f64,
    particles: Vec<Particle>,
    swarm_best: Option<Scored>,
    initial_velocity: Vec<Vec<f64>>,
}

impl ParticleSwarm {
    /// Creates a swarm of 10 particles with `w = 0.5`, `c_k = 0.5`, `c_s = 0.9`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_particles: 10,
            inertia: 0.5,
            cognitive: 0.5,
            social: 0.9,
            particles: Vec::new(),
            swarm_best: None,
            initial_velocity: Vec::new(),
        }
    }

    /// Sets the swarm size (at least 1).
    #[must_use]
    pub fn n_particles(mut self, n: usize) -> Self {
        self.n_particles = n.max(1);
        self
    }

    /// Sets the inertia weight `w`.
    #[must_use]
    pub fn inertia(mut self, w: f64) -> Self {
        self.inertia = w;
        self
    }

    /// Sets the cognitive weight `c_k` (pull towards the personal best).
    #[must_use]
    pub fn cognitive_weight(mut self, c: f64) -> Self {
        self.cognitive = c;
        self
    }

    /// Sets the social weight `c_s` (pull towards the swarm best).
    #[must_use]
    pub fn social_weight(mut self, c: f64) -> Self {
        self.social = c;
        self
    }

    /// The best position found by the swarm as of the last barrier.
    #[must_use]
    pub fn swarm_best(&self) -> Option<&Scored> {
        self.swarm_best.as_ref()
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn fly(
        &self,
        particle: &Particle,
        global: &Position,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> (Position, Vec<f64>) {
        let mut velocity = Vec::with_capacity(space.len());
        let mut indices = Vec::with_capacity(space.len());
        for (d, dim) in space.dimensions().iter().enumerate() {
            let x = particle.position[d] as f64;
            let p = particle.personal_best.position[d] as f64;
            let g = global[d] as f64;
            let limit = dim.len() as f64;
            let v = (self.inertia * particle.velocity[d]
                + self.cognitive * rng.f64() * (p - x)
                + self.social * rng.f64() * (g - x))
                .clamp(-limit, limit);
            let next = (x + v).round().clamp(0.0, dim.max_index() as f64);
            velocity.push(v);
            indices.push(next as usize);
        }
        (Position::new(indices), velocity)
    }
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ParticleSwarm {
    fn name(&self) -> &'static str {
        "ParticleSwarm"
    }

    #[allow(clippy::cast_precision_loss)]
    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        if self.particles.is_empty() {
            self.initial_velocity = (0..self.n_particles)
                .map(|_| {
                    space
                        .dimensions()
                        .iter()
                        .map(|dim| {
                            let half = dim.len() as f64 / 4.0;
                            rng_util::f64_range(rng, -half, half)
                        })
                        .collect()
                })
                .collect();
            let mut seeds = Vec::with_capacity(self.n_particles);
            seeds.push(local_move(&state.current().position, space, 1, rng));
            for _ in 1..self.n_particles {
                seeds.push(space.random_position(rng));
            }
            return seeds;
        }
        let global = self
            .swarm_best
            .as_ref()
            .map_or_else(|| state.best().position.clone(), |g| g.position.clone());
        let mut proposals = Vec::with_capacity(self.particles.len());
        let mut velocities = Vec::with_capacity(self.particles.len());
        for particle in &self.particles {
            let (next, velocity) = self.fly(particle, &global, space, rng);
            proposals.push(next);
            velocities.push(velocity);
        }
        for (particle, velocity) in self.particles.iter_mut().zip(velocities) {
            particle.velocity = velocity;
        }
        proposals
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        if self.particles.is_empty() {
            let velocities = core::mem::take(&mut self.initial_velocity);
            self.particles = evaluated
                .iter()
                .zip(velocities)
                .map(|(s, velocity)| Particle {
                    position: s.position.clone(),
                    velocity,
                    personal_best: s.clone(),
                })
                .collect();
        } else {
            for (particle, candidate) in self.particles.iter_mut().zip(evaluated) {
                particle.position = candidate.position.clone();
                if candidate.not_worse_than(&particle.personal_best) {
                    particle.personal_best = candidate.clone();
                }
            }
        }
        if let Some(i) = fittest(evaluated) {
            state.set_current(evaluated[i].clone());
        }
    }

    fn coordinate(&mut self, _state: &mut OptimizerState, _rng: &mut fastrand::Rng) {
        let bests: Vec<Scored> = self
            .particles
            .iter()
            .map(|p| p.personal_best.clone())
            .collect();
        if let Some(i) = fittest(&bests) {
            let candidate = &bests[i];
            if self
                .swarm_best
                .as_ref()
                .is_none_or(|g| candidate.not_worse_than(g))
            {
                self.swarm_best = Some(candidate.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, scored, space, state_at};
    use super::*;

    #[test]
    fn test_swarm_best_only_moves_at_the_barrier() {
        let space = space();
        let mut pso = ParticleSwarm::new().n_particles(4);
        let mut state = state_at(vec![0, 19, 0]);
        let mut rng = fastrand::Rng::with_seed(11);
        drive(&mut pso, &space, &mut state, 1, &mut rng);
        let before = pso.swarm_best().cloned();
        let peak = Position::new(vec![15, 5, 2]);

        let mut batch: Vec<Scored> = pso
            .propose(&state, &space, &mut rng)
            .into_iter()
            .map(scored)
            .collect();
        batch[0] = scored(peak.clone());
        pso.accept(&mut state, &batch, &mut rng);
        assert_eq!(pso.swarm_best().cloned(), before);

        pso.coordinate(&mut state, &mut rng);
        assert_eq!(pso.swarm_best().map(|g| &g.position), Some(&peak));
    }

    #[test]
    fn test_seeding_builds_the_swarm() {
        let space = space();
        let mut pso = ParticleSwarm::new().n_particles(6);
        let mut state = state_at(vec![1, 1, 1]);
        let mut rng = fastrand::Rng::with_seed(3);
        drive(&mut pso, &space, &mut state, 1, &mut rng);
        assert_eq!(pso.particles.len(), 6);
        assert!(pso.swarm_best().is_some());
        assert!(pso.particles.iter().all(|p| p.velocity.len() == 3));
    }

    #[test]
    fn test_personal_bests_never_regress() {
        let space = space();
        let mut pso = ParticleSwarm::new();
        let mut state = state_at(vec![0, 0, 0]);
        let mut rng = fastrand::Rng::with_seed(4);
        drive(&mut pso, &space, &mut state, 1, &mut rng);
        let before: Vec<f64> = pso.particles.iter().map(|p| p.personal_best.fitness).collect();
        drive(&mut pso, &space, &mut state, 10, &mut rng);
        for (p, b) in pso.particles.iter().zip(before) {
            assert!(p.personal_best.fitness >= b);
        }
    }

    #[test]
    fn test_swarm_converges_near_peak() {
        let space = space();
        let mut pso = ParticleSwarm::new();
        let mut state = state_at(vec![0, 19, 0]);
        let mut rng = fastrand::Rng::with_seed(7);
        drive(&mut pso, &space, &mut state, 60, &mut rng);
        assert!(state.best().score >= -20.0, "best {}", state.best().score);
    }
}
