//! Gaussian-process Bayesian optimization over index positions.
//!
//! Positions are scaled per dimension from the space's bounds: index `i` of a
//! dimension whose largest index is `m` maps to `i / (m · ℓ)`, with the
//! lengthscale `ℓ = max(0.2, 2 / m)` so that a short dimension (a flag, a
//! three-way choice) always correlates neighbouring candidates. A zero-mean
//! GP with a unit **Matérn 5/2 kernel** is fitted by Cholesky decomposition to
//! the standardized fitness of the latest 100 observations. Each proposal
//! scores `n_candidates` random unevaluated positions and returns the one with
//! the highest Expected Improvement over the best observation.
//!
//! If the fit fails (the kernel matrix is not positive definite) the first
//! unevaluated candidate is proposed as is. If no unevaluated position could
//! be drawn, the proposal falls back to a uniform random position.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};

use super::Strategy;
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

const DEFAULT_N_CANDIDATES: usize = 200;
const DEFAULT_NOISE_VAR: f64 = 1e-6;
/// Maximum number of observations the surrogate is fitted on.
const MAX_TRAIN_POINTS: usize = 100;
/// Smallest lengthscale, as a fraction of a dimension's index range.
const MIN_LENGTHSCALE: f64 = 0.2;
/// Candidates spanned by one lengthscale in short dimensions.
const LENGTHSCALE_STEPS: f64 = 2.0;

/// A surrogate-model strategy for expensive objectives.
///
/// # Examples
///
/// ```
/// use hypersearch::strategy::{Bayesian, Strategy};
///
/// let strategy = Bayesian::new().n_candidates(500).noise_variance(1e-4);
/// assert_eq!(strategy.name(), "Bayesian");
/// ```
#[derive(Clone, Debug)]
pub struct Bayesian {
    n_candidates: usize,
    noise_variance: f64,
    observations: Vec<(Position, f64)>,
    seen: HashSet<Position>,
}

impl Bayesian {
    /// Creates a Bayesian strategy with 200 candidates and noise `1e-6`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_candidates: DEFAULT_N_CANDIDATES,
            noise_variance: DEFAULT_NOISE_VAR,
            observations: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Sets how many random candidates are scored per proposal (at least 1).
    #[must_use]
    pub fn n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    /// Sets the observation noise added to the kernel diagonal.
    #[must_use]
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = v.max(0.0);
        self
    }

    /// The number of observations the surrogate was trained on so far.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }

    fn observe(&mut self, scored: &Scored) {
        self.seen.insert(scored.position.clone());
        self.observations
            .push((scored.position.clone(), scored.fitness));
    }

    fn draw_unseen(&self, space: &SearchSpace, rng: &mut fastrand::Rng) -> Vec<Position> {
        let mut candidates = Vec::with_capacity(self.n_candidates);
        let mut drawn = HashSet::with_capacity(self.n_candidates);
        for _ in 0..self.n_candidates * 4 {
            if candidates.len() == self.n_candidates {
                break;
            }
            let p = space.random_position(rng);
            if !self.seen.contains(&p) && drawn.insert(p.clone()) {
                candidates.push(p);
            }
        }
        candidates
    }

    fn surrogate(&self, space: &SearchSpace) -> Option<Surrogate> {
        let start = self.observations.len().saturating_sub(MAX_TRAIN_POINTS);
        Surrogate::fit(
            &self.observations[start..],
            IndexScaling::new(space),
            self.noise_variance,
        )
    }
}

impl Default for Bayesian {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Bayesian {
    fn name(&self) -> &'static str {
        "Bayesian"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        if self.observations.is_empty() {
            self.observe(state.current());
        }
        let mut candidates = self.draw_unseen(space, rng);
        if candidates.is_empty() {
            trace_debug!("no unevaluated candidates left, proposing at random");
            return vec![space.random_position(rng)];
        }
        let Some(surrogate) = self.surrogate(space) else {
            trace_debug!("gp fit failed, proposing an unseen random candidate");
            return vec![candidates.swap_remove(0)];
        };
        let scores: Vec<f64> = candidates
            .iter()
            .map(|c| surrogate.expected_improvement(c))
            .collect();
        // First maximum wins, so equal scores keep the draw order.
        let best = scores
            .iter()
            .enumerate()
            .fold(0, |best, (i, &ei)| if ei > scores[best] { i } else { best });
        vec![candidates.swap_remove(best)]
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        for candidate in evaluated {
            self.observe(candidate);
            state.set_current(candidate.clone());
        }
    }
}

/// Maps index positions into the kernel's input space.
struct IndexScaling {
    factors: Vec<f64>,
}

impl IndexScaling {
    #[allow(clippy::cast_precision_loss)]
    fn new(space: &SearchSpace) -> Self {
        let factors = space
            .bounds()
            .into_iter()
            .map(|max| {
                if max == 0 {
                    // A single candidate carries no information.
                    return 0.0;
                }
                let max = max as f64;
                let lengthscale = (LENGTHSCALE_STEPS / max).max(MIN_LENGTHSCALE);
                1.0 / (max * lengthscale)
            })
            .collect();
        Self { factors }
    }

    #[allow(clippy::cast_precision_loss)]
    fn scale(&self, position: &Position) -> Vec<f64> {
        position
            .iter()
            .zip(&self.factors)
            .map(|(&i, f)| i as f64 * f)
            .collect()
    }
}

/// Unit-variance Matérn 5/2 kernel of the scaled distance `r`:
/// `(1 + √5 r + 5/3 r²) exp(-√5 r)`.
fn matern52(r: f64) -> f64 {
    let s = 5.0_f64.sqrt() * r;
    (1.0 + s + s * s / 3.0) * (-s).exp()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// A GP posterior over standardized fitness.
struct Surrogate {
    scaling: IndexScaling,
    inputs: Vec<Vec<f64>>,
    /// Lower Cholesky factor of `K + noise · I`.
    lower: DMatrix<f64>,
    /// `(K + noise · I)⁻¹ y`.
    weights: DVector<f64>,
    /// Best standardized fitness observed.
    incumbent: f64,
}

impl Surrogate {
    /// Returns `None` without observations or if the kernel matrix is not
    /// positive definite.
    #[allow(clippy::cast_precision_loss)]
    fn fit(observations: &[(Position, f64)], scaling: IndexScaling, noise: f64) -> Option<Self> {
        let n = observations.len();
        if n == 0 {
            return None;
        }
        let mean = observations.iter().map(|(_, f)| f).sum::<f64>() / n as f64;
        let spread = (observations
            .iter()
            .map(|(_, f)| (f - mean).powi(2))
            .sum::<f64>()
            / n as f64)
            .sqrt();
        let spread = if spread > 1e-12 { spread } else { 1.0 };
        let targets = DVector::from_iterator(
            n,
            observations.iter().map(|(_, f)| (f - mean) / spread),
        );

        let inputs: Vec<Vec<f64>> = observations.iter().map(|(p, _)| scaling.scale(p)).collect();
        let gram = DMatrix::from_fn(n, n, |i, j| {
            let k = matern52(distance(&inputs[i], &inputs[j]));
            if i == j { k + noise } else { k }
        });
        let cholesky = gram.cholesky()?;
        let weights = cholesky.solve(&targets);

        Some(Self {
            scaling,
            inputs,
            lower: cholesky.l(),
            weights,
            incumbent: targets.max(),
        })
    }

    /// Posterior mean and standard deviation at `position`.
    fn predict(&self, position: &Position) -> (f64, f64) {
        let x = self.scaling.scale(position);
        let k = DVector::from_iterator(
            self.inputs.len(),
            self.inputs.iter().map(|xi| matern52(distance(&x, xi))),
        );
        let mean = k.dot(&self.weights);
        let variance = self
            .lower
            .solve_lower_triangular(&k)
            .map_or(0.0, |v| (1.0 - v.norm_squared()).max(0.0));
        (mean, variance.sqrt())
    }

    fn expected_improvement(&self, position: &Position) -> f64 {
        let (mean, std) = self.predict(position);
        expected_improvement(mean, std, self.incumbent)
    }
}

/// `EI = (μ - y*) Φ(z) + σ φ(z)` with `z = (μ - y*) / σ`, maximizing.
fn expected_improvement(mean: f64, std: f64, incumbent: f64) -> f64 {
    let gain = mean - incumbent;
    if std <= 1e-12 {
        return gain.max(0.0);
    }
    let z = gain / std;
    (gain * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
}

fn norm_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / core::f64::consts::TAU.sqrt()
}

/// Standard normal CDF through the Abramowitz-Stegun 7.1.26 `erf`
/// approximation (absolute error below `1.5e-7`).
fn norm_cdf(z: f64) -> f64 {
    let x = z.abs() / core::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = [1.061_405_429, -1.453_152_027, 1.421_413_741, -0.284_496_736, 0.254_829_592]
        .iter()
        .fold(0.0, |acc, c| (acc + c) * t);
    let erf = 1.0 - poly * (-x * x).exp();
    0.5 * (1.0 + erf.copysign(z))
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, scored, space, state_at};
    use super::*;
    use crate::space::Dimension;

    fn line(n: i64) -> SearchSpace {
        SearchSpace::new(vec![Dimension::range("k", 0..n)]).unwrap()
    }

    #[test]
    fn test_norm_cdf_reference_points() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-3);
        assert!(norm_cdf(9.0) <= 1.0);
    }

    #[test]
    fn test_scaling_follows_bounds() {
        let space = SearchSpace::new(vec![
            Dimension::new("flag", [false, true]),
            Dimension::range("depth", 0..51),
            Dimension::new("fixed", ["only"]),
        ])
        .unwrap();
        let scaled = IndexScaling::new(&space).scale(&Position::new(vec![1, 50, 0]));
        assert!((scaled[0] - 0.5).abs() < 1e-12);
        assert!((scaled[1] - 5.0).abs() < 1e-9);
        assert_eq!(scaled[2], 0.0);
    }

    #[test]
    fn test_surrogate_interpolates_observations() {
        let observations = vec![
            (Position::new(vec![0]), 1.0),
            (Position::new(vec![5]), -1.0),
            (Position::new(vec![10]), 1.0),
        ];
        let gp = Surrogate::fit(&observations, IndexScaling::new(&line(11)), 1e-6).unwrap();
        let (mid, mid_std) = gp.predict(&Position::new(vec![5]));
        let (end, _) = gp.predict(&Position::new(vec![0]));
        assert!(mid < end);
        assert!(mid_std < 1e-2);
        let (_, far_std) = gp.predict(&Position::new(vec![8]));
        assert!(far_std > mid_std);
    }

    #[test]
    fn test_ei_prefers_higher_mean() {
        assert!(expected_improvement(1.0, 0.1, 0.0) > expected_improvement(-1.0, 0.1, 0.0));
        assert_eq!(expected_improvement(-1.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_never_reproposes_seen_positions_while_unseen_exist() {
        let space = space();
        let mut bo = Bayesian::new().n_candidates(50);
        let mut state = state_at(vec![0, 0, 0]);
        let mut rng = fastrand::Rng::with_seed(10);
        let mut proposed = HashSet::new();
        proposed.insert(Position::new(vec![0, 0, 0]));
        for _ in 0..25 {
            let p = bo.propose(&state, &space, &mut rng).remove(0);
            assert!(proposed.insert(p.clone()), "re-proposed {p}");
            let scored = scored(p);
            bo.accept(&mut state, &[scored.clone()], &mut rng);
            state.offer_best(&scored);
        }
        assert_eq!(bo.n_observations(), 26);
    }

    #[test]
    fn test_exhausted_space_falls_back_to_random() {
        let space = line(2);
        let mut bo = Bayesian::new();
        let mut state = state_at(vec![0]);
        let mut rng = fastrand::Rng::with_seed(1);
        drive(&mut bo, &space, &mut state, 5, &mut rng);
        assert_eq!(bo.n_observations(), 6);
    }
}
