//! Local-search driver (§4.2): simulated annealing over partial injective maps.

use super::{build_candidates, reasoning_for_assignment, total_score};
use super::{AlgorithmKind, CompletionStatus, OptimizationRequest, OptimizationResult};
use crate::assignment::Assignment;
use crate::trainset::Trainset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const DEFAULT_INITIAL_TEMPERATURE: f64 = 100.0;
const DEFAULT_COOLING_RATE: f64 = 0.95;
const DEFAULT_MIN_TEMPERATURE: f64 = 0.01;
const DEFAULT_MAX_ITERATIONS: usize = 10_000;

enum Neighbor {
    Swap,
    Move,
}

pub struct LocalSearchDriver {
    seed: u64,
}

impl Default for LocalSearchDriver {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

impl LocalSearchDriver {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    fn random_feasible_solution(
        rng: &mut StdRng,
        eligible: &[&Trainset],
        max_positions: usize,
    ) -> Assignment {
        let mut assignment = Assignment::new();
        let mut free: Vec<usize> = (0..max_positions).collect();
        free.shuffle(rng);
        let mut order: Vec<usize> = (0..eligible.len()).collect();
        order.shuffle(rng);
        for idx in order {
            if free.is_empty() {
                break;
            }
            let slot = rng.gen_range(0..free.len());
            let position = free.swap_remove(slot);
            let _ = assignment.insert(eligible[idx].id, position);
        }
        assignment
    }

    fn perturb(
        rng: &mut StdRng,
        current: &Assignment,
        eligible: &[&Trainset],
        max_positions: usize,
    ) -> Assignment {
        if current.is_empty() {
            return current.clone();
        }
        let neighbor = if rng.gen_bool(0.5) { Neighbor::Swap } else { Neighbor::Move };
        let mut next = current.clone();
        let assigned: Vec<_> = next.pairs().collect();

        match neighbor {
            Neighbor::Swap if assigned.len() >= 2 => {
                let i = rng.gen_range(0..assigned.len());
                let mut j = rng.gen_range(0..assigned.len());
                while j == i {
                    j = rng.gen_range(0..assigned.len());
                }
                let (t1, p1) = assigned[i];
                let (t2, p2) = assigned[j];
                next.remove_trainset(t1);
                next.remove_trainset(t2);
                let _ = next.insert(t1, p2);
                let _ = next.insert(t2, p1);
            }
            _ => {
                let free: Vec<usize> = next.free_positions(max_positions).collect();
                if !free.is_empty() && !eligible.is_empty() {
                    let trainset = eligible[rng.gen_range(0..eligible.len())];
                    let new_position = free[rng.gen_range(0..free.len())];
                    next.remove_trainset(trainset.id);
                    let _ = next.insert(trainset.id, new_position);
                }
            }
        }
        next
    }
}

impl super::OptimizerDriver for LocalSearchDriver {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::LocalSearch
    }

    fn run(
        &self,
        fleet: &[Trainset],
        request: &OptimizationRequest,
        today: chrono::NaiveDate,
    ) -> OptimizationResult {
        let started = Instant::now();
        let candidates = build_candidates(fleet, today, &request.health_by_trainset, request.weights);
        let eligible = candidates.eligible;

        if eligible.is_empty() || request.max_positions == 0 {
            return OptimizationResult {
                assignment: Assignment::new(),
                score: 0.0,
                algorithm: AlgorithmKind::LocalSearch,
                execution_time: started.elapsed(),
                reasoning: Default::default(),
                constraint_violations: 0,
                status: CompletionStatus::Failed,
            };
        }

        let initial_temperature = request.params.initial_temperature.unwrap_or(DEFAULT_INITIAL_TEMPERATURE);
        let cooling_rate = request.params.cooling_rate.unwrap_or(DEFAULT_COOLING_RATE);
        let min_temperature = request.params.min_temperature.unwrap_or(DEFAULT_MIN_TEMPERATURE);
        let max_iterations = request.params.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let max_positions = request.max_positions;

        let mut current = Self::random_feasible_solution(&mut rng, &eligible, max_positions);
        let mut current_score = total_score(&current, &eligible, &candidates.ctx);
        let mut best = current.clone();
        let mut best_score = current_score;

        let mut temperature = initial_temperature;
        let mut iteration = 0;

        while temperature > min_temperature && iteration < max_iterations {
            let candidate = Self::perturb(&mut rng, &current, &eligible, max_positions);
            let candidate_score = total_score(&candidate, &eligible, &candidates.ctx);
            let delta = candidate_score - current_score;

            let accept = if delta >= 0.0 {
                true
            } else {
                rng.gen_bool((delta / temperature).exp().clamp(0.0, 1.0))
            };

            if accept {
                current = candidate;
                current_score = candidate_score;
                if current_score > best_score {
                    best = current.clone();
                    best_score = current_score;
                }
            }

            temperature *= cooling_rate;
            iteration += 1;
        }

        let reasoning = reasoning_for_assignment(&best, &eligible, &candidates.ctx);

        OptimizationResult {
            assignment: best,
            score: best_score,
            algorithm: AlgorithmKind::LocalSearch,
            execution_time: started.elapsed(),
            reasoning,
            constraint_violations: 0,
            status: CompletionStatus::Completed,
        }
    }
}
