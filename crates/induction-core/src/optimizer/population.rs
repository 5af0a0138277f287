//! Population driver (§4.2): genetic algorithm over partial injective maps.
//!
//! RNG usage follows the teacher's `distributions::ExponentialInterArrival`
//! pattern — a `u64` seed turned into `StdRng::seed_from_u64` — so that a
//! fixed seed reproduces identical assignments (§8 determinism law).

use super::{build_candidates, reasoning_for_assignment, total_score};
use super::{AlgorithmKind, CompletionStatus, OptimizationRequest, OptimizationResult};
use crate::assignment::Assignment;
use crate::trainset::Trainset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const DEFAULT_POPULATION_SIZE: usize = 100;
const DEFAULT_GENERATIONS: usize = 1000;
const DEFAULT_MUTATION_RATE: f64 = 0.1;
const DEFAULT_ELITE_FRACTION: f64 = 0.1;
/// Probability an eligible trainset is assigned at all during random
/// individual construction (§4.2).
const ASSIGNMENT_PROBABILITY: f64 = 0.7;
/// Fraction of the population parents are drawn from during crossover.
const PARENT_POOL_FRACTION: f64 = 0.2;

pub struct PopulationDriver {
    seed: u64,
}

impl Default for PopulationDriver {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

impl PopulationDriver {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    fn random_individual(
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
            if rng.gen_bool(ASSIGNMENT_PROBABILITY) {
                let slot = rng.gen_range(0..free.len());
                let position = free.swap_remove(slot);
                let _ = assignment.insert(eligible[idx].id, position);
            }
        }
        assignment
    }

    fn crossover(
        rng: &mut StdRng,
        parent1: &Assignment,
        parent2: &Assignment,
        eligible: &[&Trainset],
    ) -> Assignment {
        let mut child = Assignment::new();
        for trainset in eligible {
            let from_parent1 = rng.gen_bool(0.5);
            let chosen = if from_parent1 {
                parent1.position_of(trainset.id).or_else(|| parent2.position_of(trainset.id))
            } else {
                parent2.position_of(trainset.id).or_else(|| parent1.position_of(trainset.id))
            };
            if let Some(position) = chosen {
                if child.is_position_free(position) {
                    let _ = child.insert(trainset.id, position);
                }
            }
        }
        child
    }

    fn mutate(rng: &mut StdRng, individual: &mut Assignment, eligible: &[&Trainset], max_positions: usize) {
        if eligible.is_empty() {
            return;
        }
        let free: Vec<usize> = individual.free_positions(max_positions).collect();
        if free.is_empty() {
            return;
        }
        let trainset = eligible[rng.gen_range(0..eligible.len())];
        let new_position = free[rng.gen_range(0..free.len())];
        individual.remove_trainset(trainset.id);
        let _ = individual.insert(trainset.id, new_position);
    }
}

impl super::OptimizerDriver for PopulationDriver {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Population
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
                algorithm: AlgorithmKind::Population,
                execution_time: started.elapsed(),
                reasoning: Default::default(),
                constraint_violations: 0,
                status: CompletionStatus::Failed,
            };
        }

        let population_size = request.params.population_size.unwrap_or(DEFAULT_POPULATION_SIZE);
        let generations = request.params.generations.unwrap_or(DEFAULT_GENERATIONS);
        let mutation_rate = request.params.mutation_rate.unwrap_or(DEFAULT_MUTATION_RATE);
        let elite_fraction = request.params.elite_fraction.unwrap_or(DEFAULT_ELITE_FRACTION);
        let elite_count = ((population_size as f64) * elite_fraction).ceil().max(1.0) as usize;
        let parent_pool_size = ((population_size as f64) * PARENT_POOL_FRACTION).ceil().max(1.0) as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let max_positions = request.max_positions;

        let mut population: Vec<Assignment> = (0..population_size)
            .map(|_| Self::random_individual(&mut rng, &eligible, max_positions))
            .collect();

        let mut best: Option<(Assignment, f64)> = None;

        for _ in 0..generations {
            let mut scored: Vec<(usize, f64)> = population
                .iter()
                .enumerate()
                .map(|(i, a)| (i, total_score(a, &eligible, &candidates.ctx)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

            if let Some(&(best_idx, best_score)) = scored.first() {
                if best.as_ref().map_or(true, |(_, s)| best_score > *s) {
                    best = Some((population[best_idx].clone(), best_score));
                }
            }

            let elite: Vec<Assignment> = scored
                .iter()
                .take(elite_count)
                .map(|&(i, _)| population[i].clone())
                .collect();

            let parent_pool: Vec<&Assignment> = scored
                .iter()
                .take(parent_pool_size.max(elite_count))
                .map(|&(i, _)| &population[i])
                .collect();

            let mut next_generation = elite;
            while next_generation.len() < population_size && !parent_pool.is_empty() {
                let parent1 = parent_pool[rng.gen_range(0..parent_pool.len())];
                let parent2 = parent_pool[rng.gen_range(0..parent_pool.len())];
                let mut child = Self::crossover(&mut rng, parent1, parent2, &eligible);
                if rng.gen_bool(mutation_rate) {
                    Self::mutate(&mut rng, &mut child, &eligible, max_positions);
                }
                next_generation.push(child);
            }
            population = next_generation;
        }

        let Some((assignment, _score)) = best else {
            return OptimizationResult {
                assignment: Assignment::new(),
                score: 0.0,
                algorithm: AlgorithmKind::Population,
                execution_time: started.elapsed(),
                reasoning: Default::default(),
                constraint_violations: 0,
                status: CompletionStatus::Failed,
            };
        };

        let reasoning = reasoning_for_assignment(&assignment, &eligible, &candidates.ctx);
        let final_score = total_score(&assignment, &eligible, &candidates.ctx);

        OptimizationResult {
            assignment,
            score: final_score,
            algorithm: AlgorithmKind::Population,
            execution_time: started.elapsed(),
            reasoning,
            constraint_violations: 0,
            status: CompletionStatus::Completed,
        }
    }
}
