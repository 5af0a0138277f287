//! Multi-algorithm schedule generation (§4.5): run all three optimizer
//! drivers, keep the best completed result, enrich with performance metrics,
//! risk assessment, and up to two alternative results.

use crate::assignment::Assignment;
use crate::error::SchedulerError;
use crate::optimizer::{
    self, AlgorithmKind, AlgorithmParams, CompletionStatus, OptimizationRequest, OptimizationResult, OptimizerDriver,
};
use crate::trainset::{Trainset, TrainsetId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

use super::request::ScheduleRequest;

/// One step of a `GeneratedSchedule`'s execution plan (§3): inducting a
/// single assigned trainset at its scheduled position, spaced `frequency_minutes`
/// apart starting at the schedule's generation time.
#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub sequence: usize,
    pub trainset: TrainsetId,
    pub position: usize,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Per-trainset induction duration budgeted into each execution step.
const STEP_DURATION: Duration = Duration::from_secs(120);

/// Builds the ordered execution plan (§3): one step per assigned trainset,
/// ordered by stabling position (lowest first, matching induction order),
/// spaced `frequency_minutes` apart starting at `request.generated_at`.
fn build_execution_plan(assignment: &Assignment, request: &ScheduleRequest) -> Vec<ExecutionStep> {
    let mut pairs: Vec<(TrainsetId, usize)> = assignment.pairs().collect();
    pairs.sort_by_key(|&(_, position)| position);

    let spacing = Duration::from_secs(u64::from(request.constraints.frequency_minutes) * 60);
    pairs
        .into_iter()
        .enumerate()
        .map(|(sequence, (trainset, position))| ExecutionStep {
            sequence,
            trainset,
            position,
            description: format!("induct trainset into position {position}"),
            scheduled_at: request.generated_at + chrono::Duration::from_std(spacing * sequence as u32).unwrap_or_default(),
            duration: STEP_DURATION,
        })
        .collect()
}

/// Monitoring alerts (§3) surfaced alongside a generated schedule: one per
/// risk dimension that crosses a 0.5 concern threshold, plus a sparse-fleet
/// warning when the eligible pool barely covers the template minimum.
fn monitoring_alerts(risk: &RiskAssessment, request: &ScheduleRequest) -> Vec<String> {
    let mut alerts = Vec::new();
    if risk.operational > 0.5 {
        alerts.push("elevated operational risk: constraint violations in chosen assignment".to_string());
    }
    if risk.maintenance > 0.5 {
        alerts.push("elevated maintenance risk: low-scoring assignment".to_string());
    }
    if risk.weather > 0.2 {
        alerts.push(format!("weather conditions ({}) may affect service reliability", request.weather_conditions));
    }
    if risk.demand_mismatch > 0.5 {
        alerts.push("demand mismatch: assigned capacity diverges from forecast".to_string());
    }
    if request.constraints.eligible.len() <= request.constraints.min_trainsets {
        alerts.push("eligible fleet is at or below the template minimum".to_string());
    }
    alerts
}

#[derive(Debug, Clone, Copy)]
pub struct PerformanceMetrics {
    pub efficiency: f64,
    pub reliability: f64,
    pub energy_efficiency: f64,
    pub passenger_satisfaction: f64,
    pub maintenance_optimality: f64,
    pub cost_effectiveness: f64,
}

impl PerformanceMetrics {
    pub fn as_slice(&self) -> [f64; 6] {
        [
            self.efficiency,
            self.reliability,
            self.energy_efficiency,
            self.passenger_satisfaction,
            self.maintenance_optimality,
            self.cost_effectiveness,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiskAssessment {
    pub operational: f64,
    pub maintenance: f64,
    pub weather: f64,
    pub demand_mismatch: f64,
    pub overall: f64,
}

#[derive(Debug, Clone)]
pub struct AlternativeOption {
    pub label: &'static str,
    pub trainset_count: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct GeneratedSchedule {
    pub schedule_id: String,
    pub schedule_type: super::request::ScheduleType,
    pub generated_at: DateTime<Utc>,
    pub assignment: Assignment,
    pub result: OptimizationResult,
    pub performance: PerformanceMetrics,
    pub risk: RiskAssessment,
    pub alternatives: Vec<AlternativeOption>,
    pub confidence: f64,
    pub execution_plan: Vec<ExecutionStep>,
    pub monitoring_alerts: Vec<String>,
}

const ALGORITHMS: [AlgorithmKind; 3] = [AlgorithmKind::Exact, AlgorithmKind::Population, AlgorithmKind::LocalSearch];

/// Runs every algorithm with the given `max_positions`, returning the best
/// completed result (by score), or `None` if all failed.
fn best_of_all_algorithms(
    fleet: &[Trainset],
    max_positions: usize,
    health_by_trainset: &Option<HashMap<TrainsetId, crate::health::HealthStatus>>,
    weights: crate::scoring::ScoringWeights,
    timeout_seconds: u64,
    today: chrono::NaiveDate,
) -> Option<OptimizationResult> {
    let results = ALGORITHMS.into_iter().map(|algorithm| {
        let request = OptimizationRequest {
            algorithm,
            max_positions,
            timeout_seconds,
            params: AlgorithmParams::default(),
            health_by_trainset: health_by_trainset.clone(),
            weights,
        };
        match algorithm {
            AlgorithmKind::Exact => optimizer::ExactDriver.run(fleet, &request, today),
            AlgorithmKind::Population => optimizer::PopulationDriver::default().run(fleet, &request, today),
            AlgorithmKind::LocalSearch => optimizer::LocalSearchDriver::default().run(fleet, &request, today),
        }
    });
    select_best_completed(results)
}

/// Keeps the highest-scoring completed result, ignoring any that failed to
/// complete (§4.5: one algorithm's solver timeout or infeasibility must not
/// sink the whole generation as long as another algorithm completes).
fn select_best_completed(results: impl Iterator<Item = OptimizationResult>) -> Option<OptimizationResult> {
    results
        .filter(|result| result.status == CompletionStatus::Completed)
        .fold(None, |best, result| match &best {
            Some(current) if current.score >= result.score => best,
            _ => Some(result),
        })
}

/// Re-runs the optimizer at a different `max_positions` cap for an
/// alternative option, discarding anything that fails to complete.
fn alternative(
    label: &'static str,
    fleet: &[Trainset],
    max_positions: usize,
    health_by_trainset: &Option<HashMap<TrainsetId, crate::health::HealthStatus>>,
    weights: crate::scoring::ScoringWeights,
    today: chrono::NaiveDate,
) -> Option<AlternativeOption> {
    let request = OptimizationRequest {
        algorithm: AlgorithmKind::Exact,
        max_positions,
        timeout_seconds: 30,
        params: AlgorithmParams::default(),
        health_by_trainset: health_by_trainset.clone(),
        weights,
    };
    let result = optimizer::ExactDriver.run(fleet, &request, today);
    if result.status != CompletionStatus::Completed {
        return None;
    }
    Some(AlternativeOption { label, trainset_count: result.assignment.len(), score: result.score })
}

fn performance_metrics(result: &OptimizationResult, fleet: &[Trainset]) -> PerformanceMetrics {
    let assigned_ids: Vec<TrainsetId> = result.assignment.pairs().map(|(id, _)| id).collect();
    let assigned: Vec<&Trainset> = fleet.iter().filter(|t| assigned_ids.contains(&t.id)).collect();

    let reliability = if assigned.is_empty() {
        0.0
    } else {
        crate::stats::mean(&assigned.iter().map(|t| t.reliability_score).collect::<Vec<_>>())
    };
    let energy_efficiency = if assigned.is_empty() {
        0.0
    } else {
        crate::stats::mean(&assigned.iter().map(|t| t.energy_efficiency_score).collect::<Vec<_>>())
    };

    PerformanceMetrics {
        efficiency: (result.score / 1000.0).clamp(0.0, 1.0),
        reliability,
        energy_efficiency,
        passenger_satisfaction: (result.score / 1000.0).clamp(0.0, 1.0),
        maintenance_optimality: 1.0 - (result.constraint_violations as f64 * 0.1).min(1.0),
        cost_effectiveness: (1.0 - (result.execution_time.as_secs_f64() / 30.0)).clamp(0.0, 1.0),
    }
}

/// Demand-mismatch risk rises with both over- and under-utilization of the
/// assigned fleet (§4.5, mirroring the reference scheduler's utilization
/// bands: >0.9 over-capacity, <0.3 under-utilization, else a flat 0.1).
fn demand_mismatch_risk(assigned_count: usize, expected_demand: u64) -> f64 {
    let capacity = assigned_count as f64 * 1000.0;
    if capacity <= 0.0 {
        return 1.0;
    }
    let utilization = expected_demand as f64 / capacity;
    if utilization > 0.9 {
        ((utilization - 0.9) * 10.0).min(1.0)
    } else if utilization < 0.3 {
        ((0.3 - utilization) * 2.0).min(1.0)
    } else {
        0.1
    }
}

fn risk_assessment(result: &OptimizationResult, request: &ScheduleRequest, weather_factor: f64) -> RiskAssessment {
    let operational = (result.constraint_violations as f64 * 0.2).min(1.0);
    let maintenance = 1.0 - (result.score / 1000.0).clamp(0.0, 1.0);
    let weather = (weather_factor - 1.0).max(0.0);
    let demand_mismatch = demand_mismatch_risk(result.assignment.len(), request.expected_demand);
    let overall = crate::stats::mean(&[operational, maintenance, weather, demand_mismatch]);
    RiskAssessment { operational, maintenance, weather, demand_mismatch, overall }
}

/// Generates a schedule for `request`: runs all three drivers, keeps the
/// best, enriches with metrics/risk/alternatives. Returns
/// `SchedulerError::AllAlgorithmsFailed` if nothing completes.
pub fn generate(
    fleet: &[Trainset],
    request: &ScheduleRequest,
    health_by_trainset: &Option<HashMap<TrainsetId, crate::health::HealthStatus>>,
    weights: crate::scoring::ScoringWeights,
    weather_factor: f64,
    today: chrono::NaiveDate,
) -> Result<GeneratedSchedule, SchedulerError> {
    let primary_cap = request.constraints.max_trainsets.max(1);
    let best = best_of_all_algorithms(fleet, primary_cap, health_by_trainset, weights, 30, today)
        .ok_or(SchedulerError::AllAlgorithmsFailed)?;

    let performance = performance_metrics(&best, fleet);
    let risk = risk_assessment(&best, request, weather_factor);

    let mut alternatives = Vec::new();
    let assigned = best.assignment.len();
    if assigned > request.constraints.min_trainsets {
        let conservative_cap = request.constraints.min_trainsets.max(assigned.saturating_sub(3));
        if let Some(alt) = alternative("conservative", fleet, conservative_cap, health_by_trainset, weights, today) {
            alternatives.push(alt);
        }
    }
    if assigned < request.constraints.max_trainsets {
        let aggressive_cap = request.constraints.max_trainsets.min(assigned + 3);
        if let Some(alt) = alternative("aggressive", fleet, aggressive_cap, health_by_trainset, weights, today) {
            alternatives.push(alt);
        }
    }
    alternatives.truncate(2);

    let factors = super::confidence::ConfidenceFactors::compose(&best, request.constraints.eligible.len(), &performance, &risk);
    let confidence = factors.confidence();
    let execution_plan = build_execution_plan(&best.assignment, request);
    let alerts = monitoring_alerts(&risk, request);

    Ok(GeneratedSchedule {
        schedule_id: request.schedule_id.clone(),
        schedule_type: request.schedule_type,
        generated_at: request.generated_at,
        assignment: best.assignment.clone(),
        result: best,
        performance,
        risk,
        alternatives,
        confidence,
        execution_plan,
        monitoring_alerts: alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::request::{create_schedule_request, default_templates, DemandPatterns};
    use crate::trainset::test_helpers::trainset;
    use crate::trainset::TrainsetStatus;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[test]
    fn generation_succeeds_with_a_healthy_fleet() {
        let fleet: Vec<_> = (0..10).map(|i| trainset(&format!("TS{i}"), TrainsetStatus::Available)).collect();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 2, 0).unwrap();
        let patterns = DemandPatterns::default();
        let templates = default_templates();
        let health = HashMap::new();
        let request = create_schedule_request(now, &fleet, &health, &patterns, &templates, "sunny", false);

        let schedule = generate(&fleet, &request, &None, crate::scoring::ScoringWeights::default(), 1.0, now.date_naive()).unwrap();
        assert_eq!(schedule.result.status, CompletionStatus::Completed);
        assert!(schedule.confidence >= 0.0 && schedule.confidence <= 1.0);
    }

    #[test]
    fn all_algorithms_failing_is_reported_as_scheduler_error() {
        let fleet: Vec<Trainset> = Vec::new();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 2, 0).unwrap();
        let patterns = DemandPatterns::default();
        let templates = default_templates();
        let health = HashMap::new();
        let request = create_schedule_request(now, &fleet, &health, &patterns, &templates, "sunny", false);

        let err = generate(&fleet, &request, &None, crate::scoring::ScoringWeights::default(), 1.0, now.date_naive()).unwrap_err();
        assert!(matches!(err, SchedulerError::AllAlgorithmsFailed));
    }

    #[test]
    fn generated_schedule_carries_an_ordered_execution_plan() {
        let fleet: Vec<_> = (0..10).map(|i| trainset(&format!("TS{i}"), TrainsetStatus::Available)).collect();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 2, 0).unwrap();
        let patterns = DemandPatterns::default();
        let templates = default_templates();
        let health = HashMap::new();
        let request = create_schedule_request(now, &fleet, &health, &patterns, &templates, "sunny", false);

        let schedule = generate(&fleet, &request, &None, crate::scoring::ScoringWeights::default(), 1.0, now.date_naive()).unwrap();

        assert_eq!(schedule.execution_plan.len(), schedule.assignment.len());
        for step in &schedule.execution_plan {
            assert_eq!(schedule.assignment.position_of(step.trainset), Some(step.position));
        }
        let positions: Vec<usize> = schedule.execution_plan.iter().map(|s| s.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);

        let spacing = chrono::Duration::minutes(i64::from(request.constraints.frequency_minutes));
        for window in schedule.execution_plan.windows(2) {
            assert_eq!(window[1].scheduled_at - window[0].scheduled_at, spacing);
        }
        assert_eq!(schedule.execution_plan[0].scheduled_at, request.generated_at);
    }

    #[test]
    fn monitoring_alerts_flags_elevated_weather_risk() {
        let risk = RiskAssessment { operational: 0.0, maintenance: 0.0, weather: 0.3, demand_mismatch: 0.0, overall: 0.075 };
        let fleet: Vec<_> = (0..10).map(|i| trainset(&format!("TS{i}"), TrainsetStatus::Available)).collect();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 2, 0).unwrap();
        let patterns = DemandPatterns::default();
        let templates = default_templates();
        let health = HashMap::new();
        let request = create_schedule_request(now, &fleet, &health, &patterns, &templates, "thunderstorm", false);

        let alerts = monitoring_alerts(&risk, &request);
        assert!(alerts.iter().any(|a| a.contains("thunderstorm")));
    }

    #[test]
    fn monitoring_alerts_flags_sparse_eligible_fleet() {
        let risk = RiskAssessment { operational: 0.0, maintenance: 0.0, weather: 0.0, demand_mismatch: 0.0, overall: 0.0 };
        let fleet: Vec<_> = (0..4).map(|i| trainset(&format!("TS{i}"), TrainsetStatus::Available)).collect();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 2, 0).unwrap();
        let patterns = DemandPatterns::default();
        let templates = default_templates();
        let health = HashMap::new();
        let request = create_schedule_request(now, &fleet, &health, &patterns, &templates, "sunny", false);

        let alerts = monitoring_alerts(&risk, &request);
        assert!(alerts.iter().any(|a| a.contains("template minimum")));
    }

    fn synthetic_result(algorithm: AlgorithmKind, status: CompletionStatus, score: f64) -> OptimizationResult {
        OptimizationResult {
            assignment: Assignment::new(),
            score,
            algorithm,
            execution_time: Duration::from_millis(1),
            reasoning: HashMap::new(),
            constraint_violations: 0,
            status,
        }
    }

    #[test]
    fn select_best_completed_falls_back_past_a_failed_exact_driver_scenario_6() {
        let results = vec![
            synthetic_result(AlgorithmKind::Exact, CompletionStatus::Failed, 0.0),
            synthetic_result(AlgorithmKind::Population, CompletionStatus::Completed, 500.0),
            synthetic_result(AlgorithmKind::LocalSearch, CompletionStatus::Completed, 650.0),
        ];
        let best = select_best_completed(results.into_iter()).expect("one algorithm completed");
        assert_eq!(best.algorithm, AlgorithmKind::LocalSearch);
        assert!((best.score - 650.0).abs() < 1e-9);
    }

    #[test]
    fn select_best_completed_is_none_when_every_algorithm_fails() {
        let results = vec![
            synthetic_result(AlgorithmKind::Exact, CompletionStatus::Failed, 0.0),
            synthetic_result(AlgorithmKind::Population, CompletionStatus::Failed, 0.0),
            synthetic_result(AlgorithmKind::LocalSearch, CompletionStatus::Failed, 0.0),
        ];
        assert!(select_best_completed(results.into_iter()).is_none());
    }
}
