//! Feasibility predicate and scoring function (§4.1).
//!
//! Both are pure functions of `(trainset, position, context)`, following the
//! same shape as the teacher's `matching::policy` module (a scoring
//! component struct with a `.total()`, built from small independently
//! testable terms) so the three optimizer drivers in `optimizer/` can share
//! one objective without drift.

use crate::health::HealthStatus;
use crate::trainset::{Trainset, TrainsetId};
use std::collections::HashMap;

/// Fixed scoring constants from §4.1.
pub const BASE_SCORE: f64 = 100.0;
pub const FITNESS_VALID_BONUS: f64 = 50.0;
pub const FITNESS_INVALID_PENALTY: f64 = -1000.0;
pub const MILEAGE_BALANCE_CAP: f64 = 100.0;
pub const BRANDING_PER_POINT: f64 = 20.0;
pub const POSITION_PREFERENCE_BASE: f64 = 50.0;
pub const POSITION_PREFERENCE_STEP: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub mileage_balance_weight: f64,
    pub branding_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            mileage_balance_weight: 0.6,
            branding_weight: 0.3,
        }
    }
}

/// Read-only context a scoring/feasibility call needs beyond the trainset
/// itself: the fleet mean mileage and, when the optimizer is invoked from
/// the Scheduler, the latest health status per trainset (§4.1).
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    pub fleet_mean_mileage: f64,
    pub health_by_trainset: Option<&'a HashMap<TrainsetId, HealthStatus>>,
    pub weights: ScoringWeights,
}

impl<'a> ScoringContext<'a> {
    pub fn health_of(&self, trainset: TrainsetId) -> Option<HealthStatus> {
        self.health_by_trainset.and_then(|m| m.get(&trainset).copied())
    }
}

/// Per-pair score contribution, broken into named terms for testability and
/// for the reasoning strings in §4.2's common post-processing.
#[derive(Debug, Clone, Copy)]
pub struct ScoreComponents {
    pub base: f64,
    pub fitness: f64,
    pub mileage_balance: f64,
    pub branding: f64,
    pub position_preference: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.base + self.fitness + self.mileage_balance + self.branding + self.position_preference
    }
}

/// `true` iff `(trainset, position)` is admissible under §4.1: valid fitness
/// certificate, no open high-priority work order, `available` status, and
/// — only when `ctx.health_by_trainset` is supplied (i.e. the optimizer was
/// invoked from the Scheduler) — health is not `critical` or `poor`.
pub fn is_feasible(trainset: &Trainset, ctx: &ScoringContext, today: chrono::NaiveDate) -> bool {
    if !trainset.fitness_currently_valid(today) {
        return false;
    }
    if trainset.has_high_priority_work {
        return false;
    }
    if trainset.status != crate::trainset::TrainsetStatus::Available {
        return false;
    }
    if let Some(status) = ctx.health_of(trainset.id) {
        if status.is_critical_or_poor() {
            return false;
        }
    }
    true
}

/// Mileage-balance term (§4.1, §9 Open Question (b)): when the fleet mean is
/// `0.0` — an edge case the reference data never actually produces but the
/// formula's division makes reachable — the term resolves to a neutral
/// `0.5` instead of dividing by zero.
pub fn mileage_balance_term(mileage: f64, fleet_mean_mileage: f64) -> f64 {
    if fleet_mean_mileage == 0.0 {
        return 0.5;
    }
    (MILEAGE_BALANCE_CAP - (mileage - fleet_mean_mileage).abs() / 1000.0).max(0.0)
}

pub fn position_preference_term(position: usize) -> f64 {
    (POSITION_PREFERENCE_BASE - POSITION_PREFERENCE_STEP * position as f64).max(0.0)
}

/// Computes the full per-pair score for `trainset` at `position` (§4.1).
/// Does not itself check feasibility — callers that may relax feasibility
/// (none do today; see §9 Open Question (a)) rely on `FITNESS_INVALID_PENALTY`
/// to keep total ordering robust even so.
pub fn score_pair(trainset: &Trainset, position: usize, ctx: &ScoringContext) -> ScoreComponents {
    let fitness = if trainset.fitness_valid {
        FITNESS_VALID_BONUS
    } else {
        FITNESS_INVALID_PENALTY
    };
    ScoreComponents {
        base: BASE_SCORE,
        fitness,
        mileage_balance: mileage_balance_term(trainset.current_mileage_km, ctx.fleet_mean_mileage)
            * ctx.weights.mileage_balance_weight,
        branding: trainset.branding_priority as f64 * BRANDING_PER_POINT * ctx.weights.branding_weight,
        position_preference: position_preference_term(position),
    }
}

/// Total score of an assignment: the sum of each assigned pair's contribution.
pub fn score_assignment(
    assignment: &crate::assignment::Assignment,
    fleet_by_id: &HashMap<TrainsetId, &Trainset>,
    ctx: &ScoringContext,
) -> f64 {
    assignment
        .pairs()
        .filter_map(|(trainset_id, position)| {
            fleet_by_id
                .get(&trainset_id)
                .map(|t| score_pair(t, position, ctx).total())
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainset::test_helpers::trainset;
    use crate::trainset::TrainsetStatus;

    fn ctx(mean: f64) -> ScoringContext<'static> {
        ScoringContext {
            fleet_mean_mileage: mean,
            health_by_trainset: None,
            weights: ScoringWeights::default(),
        }
    }

    #[test]
    fn three_identical_trainsets_score_identically_per_position() {
        // §8 scenario 2 setup: 3 identical trainsets, mileage 50000, branding 1, P=3.
        // Per §4.1's formula (weights applied, position term summed in) the
        // per-trainset common terms are 100+50+60+6=216; the scenario's
        // worked total of 810 only holds with unit weights and the position
        // term excluded from the total, which contradicts the rest of §4.1 —
        // see DESIGN.md for the resolution. Assert the formula's actual value.
        let t = trainset("TS", TrainsetStatus::Available);
        let c = ctx(50_000.0);
        let total: f64 = (0..3).map(|pos| score_pair(&t, pos, &c).total()).sum();
        assert!((total - 792.0).abs() < 1e-9, "got {total}");
    }

    #[test]
    fn zero_fleet_mean_mileage_is_neutral() {
        assert!((mileage_balance_term(1000.0, 0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fitness_invalid_penalty_dominates_total() {
        let mut t = trainset("TS", TrainsetStatus::Available);
        t.fitness_valid = false;
        let c = ctx(50_000.0);
        assert!(score_pair(&t, 0, &c).total() < 0.0);
    }

    #[test]
    fn scoring_is_monotonic_when_adding_a_positive_pair() {
        let t1 = trainset("TS1", TrainsetStatus::Available);
        let t2 = trainset("TS2", TrainsetStatus::Available);
        let mut fleet_by_id = HashMap::new();
        fleet_by_id.insert(t1.id, &t1);
        fleet_by_id.insert(t2.id, &t2);
        let c = ctx(50_000.0);

        let mut a = crate::assignment::Assignment::new();
        assert!(a.insert(t1.id, 0));
        let before = score_assignment(&a, &fleet_by_id, &c);
        assert!(a.insert(t2.id, 1));
        let after = score_assignment(&a, &fleet_by_id, &c);
        assert!(after > before);
    }

    #[test]
    fn feasibility_excludes_critical_health_only_when_scheduler_supplies_it() {
        let t = trainset("TS", TrainsetStatus::Available);
        let mut health = HashMap::new();
        health.insert(t.id, HealthStatus::Critical);
        let today = chrono::Utc::now().date_naive();

        let without_health = ctx(50_000.0);
        assert!(is_feasible(&t, &without_health, today));

        let with_health = ScoringContext {
            fleet_mean_mileage: 50_000.0,
            health_by_trainset: Some(&health),
            weights: ScoringWeights::default(),
        };
        assert!(!is_feasible(&t, &with_health, today));
    }
}
