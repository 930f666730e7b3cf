//! Tabu search with a fixed-tenure FIFO memory.

use std::collections::{HashSet, VecDeque};

use super::{Strategy, fittest, local_move};
use crate::space::{Position, SearchSpace};
use crate::state::{OptimizerState, Scored};

/// Samples `n_neighbours` local moves that are not tabu and always moves to
/// the best of them, even when it is worse than the current position.
///
/// Every position moved to is made tabu for the next `tenure` moves, which
/// keeps the search from cycling back.
#[derive(Clone, Debug)]
pub struct TabuSearch {
    tenure: usize,
    n_neighbours: usize,
    tabu_queue: VecDeque<Position>,
    tabu_set: HashSet<Position>,
}

impl TabuSearch {
    /// Creates a tabu search with tenure 10 and 3 neighbours per iteration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tenure: 10,
            n_neighbours: 3,
            tabu_queue: VecDeque::with_capacity(10),
            tabu_set: HashSet::with_capacity(10),
        }
    }

    /// Sets the memory length (at least 1).
    #[must_use]
    pub fn tenure(mut self, tenure: usize) -> Self {
        self.tenure = tenure.max(1);
        self
    }

    /// Sets the neighbours sampled per iteration (at least 1).
    #[must_use]
    pub fn n_neighbours(mut self, n: usize) -> Self {
        self.n_neighbours = n.max(1);
        self
    }

    /// Returns `true` if `position` is currently tabu.
    #[must_use]
    pub fn is_tabu(&self, position: &Position) -> bool {
        self.tabu_set.contains(position)
    }

    fn make_tabu(&mut self, position: Position) {
        if self.tabu_set.contains(&position) {
            return;
        }
        if self.tabu_queue.len() >= self.tenure
            && let Some(expired) = self.tabu_queue.pop_front()
        {
            self.tabu_set.remove(&expired);
        }
        self.tabu_set.insert(position.clone());
        self.tabu_queue.push_back(position);
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for TabuSearch {
    fn name(&self) -> &'static str {
        "TabuSearch"
    }

    fn propose(
        &mut self,
        state: &OptimizerState,
        space: &SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Vec<Position> {
        if self.tabu_queue.is_empty() {
            self.make_tabu(state.current().position.clone());
        }
        let from = &state.current().position;
        let mut neighbours = Vec::with_capacity(self.n_neighbours);
        let max_attempts = self.n_neighbours * 10;
        for _ in 0..max_attempts {
            if neighbours.len() == self.n_neighbours {
                break;
            }
            let candidate = local_move(from, space, 1, rng);
            if !self.is_tabu(&candidate) && !neighbours.contains(&candidate) {
                neighbours.push(candidate);
            }
        }
        if neighbours.is_empty() {
            // Every nearby position is tabu: jump to a random one that is not.
            let mut escape = space.random_position(rng);
            for _ in 0..max_attempts {
                if !self.is_tabu(&escape) {
                    break;
                }
                escape = space.random_position(rng);
            }
            neighbours.push(escape);
        }
        neighbours
    }

    fn accept(
        &mut self,
        state: &mut OptimizerState,
        evaluated: &[Scored],
        _rng: &mut fastrand::Rng,
    ) {
        if let Some(i) = fittest(evaluated) {
            let chosen = evaluated[i].clone();
            self.make_tabu(chosen.position.clone());
            state.set_current(chosen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{drive, scored, space, state_at};
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut tabu = TabuSearch::new().tenure(2);
        tabu.make_tabu(Position::new(vec![0]));
        tabu.make_tabu(Position::new(vec![1]));
        tabu.make_tabu(Position::new(vec![2]));
        assert!(!tabu.is_tabu(&Position::new(vec![0])));
        assert!(tabu.is_tabu(&Position::new(vec![1])));
        assert!(tabu.is_tabu(&Position::new(vec![2])));
    }

    #[test]
    fn test_readding_does_not_duplicate() {
        let mut tabu = TabuSearch::new().tenure(3);
        tabu.make_tabu(Position::new(vec![4]));
        tabu.make_tabu(Position::new(vec![4]));
        assert_eq!(tabu.tabu_queue.len(), 1);
    }

    #[test]
    fn test_proposals_avoid_tabu_positions() {
        let space = space();
        let mut tabu = TabuSearch::new().n_neighbours(5);
        let state = state_at(vec![10, 10, 1]);
        let mut rng = fastrand::Rng::with_seed(8);
        let proposals = tabu.propose(&state, &space, &mut rng);
        assert!(!proposals.contains(&Position::new(vec![10, 10, 1])));
        assert!(proposals.len() <= 5);
    }

    #[test]
    fn test_escape_from_a_tabu_neighbourhood_avoids_tabu_positions() {
        let space = SearchSpace::new(vec![crate::space::Dimension::range("k", 0..4)]).unwrap();
        for seed in 0..20 {
            let mut tabu = TabuSearch::new().n_neighbours(5);
            for k in 0..3 {
                tabu.make_tabu(Position::new(vec![k]));
            }
            let state = state_at(vec![1]);
            let mut rng = fastrand::Rng::with_seed(seed);
            let proposals = tabu.propose(&state, &space, &mut rng);
            assert_eq!(proposals, vec![Position::new(vec![3])], "seed {seed}");
        }
    }

    #[test]
    fn test_moves_to_best_neighbour_even_if_worse() {
        let mut tabu = TabuSearch::new();
        let mut state = state_at(vec![15, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(0);
        let worse = scored(Position::new(vec![14, 5, 2]));
        let worst = scored(Position::new(vec![15, 9, 2]));
        tabu.accept(&mut state, &[worst, worse.clone()], &mut rng);
        assert_eq!(state.current().position, worse.position);
        assert!(tabu.is_tabu(&worse.position));
    }

    #[test]
    fn test_finds_peak() {
        let space = space();
        let mut state = state_at(vec![0, 19, 0]);
        let mut rng = fastrand::Rng::with_seed(2);
        drive(&mut TabuSearch::new(), &space, &mut state, 200, &mut rng);
        assert_eq!(state.best().score, 0.0);
    }
}
