//! Exact driver (§4.2): maximum-weight bipartite assignment via Kuhn-Munkres.
//!
//! The ILP the spec describes (binary x[i,j], row/column sum constraints,
//! x[i,j]=0 for infeasible i) is exactly the linear assignment problem once
//! infeasible trainsets are excluded up front; grounded in the teacher's
//! `matching::hungarian::HungarianMatching`, which solves the same shape of
//! problem with `pathfinding::kuhn_munkres` over a scaled-to-i64 weight
//! matrix. Unlike the teacher, every cell here is a real feasible score —
//! feasibility is filtered before the matrix is built, not encoded in it.

use super::{build_candidates, reasoning_for_assignment, total_score};
use super::{AlgorithmKind, CompletionStatus, OptimizationRequest, OptimizationResult};
use crate::assignment::Assignment;
use crate::trainset::Trainset;
use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};
use std::time::Instant;

/// Scale factor converting an f64 score to the i64 weights `kuhn_munkres` expects.
const SCALE: f64 = 1_000_000.0;

struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

fn score_to_weight(score: f64) -> i64 {
    let w = score * SCALE;
    if w >= i64::MAX as f64 {
        i64::MAX
    } else if w <= i64::MIN as f64 {
        i64::MIN
    } else {
        w as i64
    }
}

fn failed(execution_time: std::time::Duration) -> OptimizationResult {
    OptimizationResult {
        assignment: Assignment::new(),
        score: 0.0,
        algorithm: AlgorithmKind::Exact,
        execution_time,
        reasoning: Default::default(),
        constraint_violations: 0,
        status: CompletionStatus::Failed,
    }
}

#[derive(Debug, Default)]
pub struct ExactDriver;

impl super::OptimizerDriver for ExactDriver {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Exact
    }

    fn run(
        &self,
        fleet: &[Trainset],
        request: &OptimizationRequest,
        today: chrono::NaiveDate,
    ) -> OptimizationResult {
        let started = Instant::now();
        let candidates = build_candidates(fleet, today, &request.health_by_trainset, request.weights);
        let eligible: Vec<&Trainset> = candidates.eligible;

        if eligible.is_empty() || request.max_positions == 0 {
            return failed(started.elapsed());
        }

        let positions = request.max_positions;
        let matrix: Vec<Vec<i64>> = eligible
            .iter()
            .map(|t| {
                (0..positions)
                    .map(|p| score_to_weight(crate::scoring::score_pair(t, p, &candidates.ctx).total()))
                    .collect()
            })
            .collect();
        let weights = I64Weights(matrix);

        // kuhn_munkres requires rows <= columns; transpose if there are more
        // eligible trainsets than positions and read the permutation back.
        let assignment = if weights.rows() <= weights.columns() {
            let (_total, perm) = kuhn_munkres(&weights);
            let mut a = Assignment::new();
            for (row, &col) in perm.iter().enumerate() {
                let _ = a.insert(eligible[row].id, col);
            }
            a
        } else {
            let transposed: Vec<Vec<i64>> = (0..weights.columns())
                .map(|c| (0..weights.rows()).map(|r| weights.at(r, c)).collect())
                .collect();
            let (_total, perm) = kuhn_munkres(&I64Weights(transposed));
            let mut a = Assignment::new();
            for (position, &row) in perm.iter().enumerate() {
                let _ = a.insert(eligible[row].id, position);
            }
            a
        };

        if assignment.is_empty() {
            return failed(started.elapsed());
        }

        let reasoning = reasoning_for_assignment(&assignment, &eligible, &candidates.ctx);
        let score = total_score(&assignment, &eligible, &candidates.ctx);

        OptimizationResult {
            assignment,
            score,
            algorithm: AlgorithmKind::Exact,
            execution_time: started.elapsed(),
            reasoning,
            constraint_violations: 0,
            status: CompletionStatus::Completed,
        }
    }
}
