//! Assignment Optimizer (§4.2): three interchangeable drivers sharing one
//! feasibility predicate and scoring function from [`crate::scoring`].

mod exact;
mod local_search;
mod population;

pub use exact::ExactDriver;
pub use local_search::LocalSearchDriver;
pub use population::PopulationDriver;

use crate::assignment::Assignment;
use crate::error::OptimizerError;
use crate::scoring::ScoringContext;
use crate::trainset::{fleet_mean_mileage, Trainset, TrainsetId};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    Exact,
    Population,
    LocalSearch,
}

impl AlgorithmKind {
    /// Algorithm-reliability term used by the Scheduler's confidence
    /// composition (§4.5): 0.9 for the exact driver, 0.8 otherwise.
    pub fn reliability(self) -> f64 {
        match self {
            AlgorithmKind::Exact => 0.9,
            AlgorithmKind::Population | AlgorithmKind::LocalSearch => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmKind::Exact => "exact",
            AlgorithmKind::Population => "population",
            AlgorithmKind::LocalSearch => "local_search",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed,
    Failed,
}

/// Per-algorithm tunables, carried as a loose map so the Scheduler can
/// override any one of them without the request shape changing (§4.2).
#[derive(Debug, Clone, Default)]
pub struct AlgorithmParams {
    pub population_size: Option<usize>,
    pub generations: Option<usize>,
    pub mutation_rate: Option<f64>,
    pub elite_fraction: Option<f64>,
    pub initial_temperature: Option<f64>,
    pub cooling_rate: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub algorithm: AlgorithmKind,
    pub max_positions: usize,
    pub timeout_seconds: u64,
    pub params: AlgorithmParams,
    /// Health status by trainset, supplied whenever the Scheduler (not a
    /// bare CLI run) invokes the optimizer, so the feasibility predicate can
    /// also exclude poor/critical health (§4.1).
    pub health_by_trainset: Option<HashMap<TrainsetId, crate::health::HealthStatus>>,
    pub weights: crate::scoring::ScoringWeights,
}

impl OptimizationRequest {
    pub fn validate(&self, configured_ceiling: usize) -> Result<(), OptimizerError> {
        if self.max_positions == 0 || self.max_positions > configured_ceiling {
            return Err(OptimizerError::MaxPositionsOutOfRange {
                requested: self.max_positions,
                ceiling: configured_ceiling,
            });
        }
        if !(5..=300).contains(&self.timeout_seconds) {
            return Err(OptimizerError::TimeoutOutOfRange(self.timeout_seconds));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub assignment: Assignment,
    pub score: f64,
    pub algorithm: AlgorithmKind,
    pub execution_time: Duration,
    pub reasoning: HashMap<TrainsetId, String>,
    pub constraint_violations: usize,
    pub status: CompletionStatus,
}

impl OptimizationResult {
    fn failed(algorithm: AlgorithmKind, execution_time: Duration) -> Self {
        Self {
            assignment: Assignment::new(),
            score: 0.0,
            algorithm,
            execution_time,
            reasoning: HashMap::new(),
            constraint_violations: 0,
            status: CompletionStatus::Failed,
        }
    }
}

/// A driver shared by all three algorithms: the eligible pool (already
/// filtered through [`crate::scoring::is_feasible`]) and the scoring context
/// built once per request.
struct Candidates<'a> {
    eligible: Vec<&'a Trainset>,
    ctx: ScoringContext<'a>,
}

fn build_candidates<'a>(
    fleet: &'a [Trainset],
    today: chrono::NaiveDate,
    health_by_trainset: &'a Option<HashMap<TrainsetId, crate::health::HealthStatus>>,
    weights: crate::scoring::ScoringWeights,
) -> Candidates<'a> {
    let ctx = ScoringContext {
        fleet_mean_mileage: fleet_mean_mileage(fleet),
        health_by_trainset: health_by_trainset.as_ref(),
        weights,
    };
    let eligible = fleet
        .iter()
        .filter(|t| crate::scoring::is_feasible(t, &ctx, today))
        .collect();
    Candidates { eligible, ctx }
}

/// Reasoning string composed per §4.2's "common post-processing": fitness
/// note, work-order note, branding note if priority > 3, mileage note
/// relative to the fleet mean, final position.
fn reasoning_for(trainset: &Trainset, position: usize, ctx: &ScoringContext) -> String {
    let mut parts = Vec::new();
    parts.push(if trainset.fitness_valid {
        "fitness certificate valid".to_string()
    } else {
        "fitness certificate invalid".to_string()
    });
    if trainset.pending_work_orders > 0 {
        parts.push(format!("{} pending work order(s)", trainset.pending_work_orders));
    }
    if trainset.branding_priority > 3 {
        parts.push(format!("high branding priority ({})", trainset.branding_priority));
    }
    if ctx.fleet_mean_mileage > 0.0 {
        let ratio = trainset.current_mileage_km / ctx.fleet_mean_mileage;
        if ratio < 0.9 {
            parts.push("low mileage, good for service".to_string());
        } else if ratio > 1.1 {
            parts.push("high mileage, consider maintenance".to_string());
        }
    }
    parts.push(format!("assigned to position {position}"));
    parts.join("; ")
}

fn reasoning_for_assignment(
    assignment: &Assignment,
    eligible: &[&Trainset],
    ctx: &ScoringContext,
) -> HashMap<TrainsetId, String> {
    let by_id: HashMap<TrainsetId, &Trainset> = eligible.iter().map(|t| (t.id, *t)).collect();
    assignment
        .pairs()
        .filter_map(|(id, pos)| by_id.get(&id).map(|t| (id, reasoning_for(t, pos, ctx))))
        .collect()
}

/// Total score of `assignment` restricted to the eligible pool, shared by
/// all three drivers so they optimize identical objectives.
pub(crate) fn total_score(
    assignment: &Assignment,
    eligible: &[&Trainset],
    ctx: &ScoringContext,
) -> f64 {
    let by_id: HashMap<TrainsetId, &Trainset> = eligible.iter().map(|t| (t.id, *t)).collect();
    crate::scoring::score_assignment(assignment, &by_id, ctx)
}

pub trait OptimizerDriver {
    fn kind(&self) -> AlgorithmKind;

    fn run(
        &self,
        fleet: &[Trainset],
        request: &OptimizationRequest,
        today: chrono::NaiveDate,
    ) -> OptimizationResult;
}

/// Runs `request.algorithm` against `fleet`, dispatching to the matching
/// driver. Synchronous validation errors propagate; solver timeout or
/// infeasibility come back as `status = Failed` inside the result (§4.2).
pub fn optimize(
    fleet: &[Trainset],
    request: &OptimizationRequest,
    configured_ceiling: usize,
    today: chrono::NaiveDate,
) -> Result<OptimizationResult, OptimizerError> {
    if fleet.is_empty() {
        return Err(OptimizerError::EmptyFleet);
    }
    request.validate(configured_ceiling)?;

    let result = match request.algorithm {
        AlgorithmKind::Exact => ExactDriver.run(fleet, request, today),
        AlgorithmKind::Population => PopulationDriver::default().run(fleet, request, today),
        AlgorithmKind::LocalSearch => LocalSearchDriver::default().run(fleet, request, today),
    };
    Ok(result)
}
