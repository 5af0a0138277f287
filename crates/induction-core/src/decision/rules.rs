//! Rule evaluators (§4.4): four pure functions of an `EvaluationContext`,
//! each producing zero or more decisions. Missing data short-circuits to an
//! empty result rather than fabricating a decision (§7).

use super::{ActionPlan, Decision, DecisionId, DecisionType, Urgency};
use crate::health::HealthStatus;
use crate::trainset::{Trainset, TrainsetId, TrainsetStatus};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::collections::HashMap;

/// Hours at which the schedule-optimization rule fires, within the first
/// five minutes of the hour.
const SCHEDULE_OPTIMIZATION_HOURS: [u32; 5] = [6, 10, 14, 18, 22];
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// A feature vector → (success_probability, maintenance_hours, energy_consumption)
/// collaborator (§6's ML prediction interface), queried only by the
/// schedule-optimization rule.
pub trait SuccessPredictor: Send + Sync {
    fn predict(&self, features: &HashMap<&'static str, f64>) -> PredictedOutcome;
}

#[derive(Debug, Clone, Copy)]
pub struct PredictedOutcome {
    pub success_probability: f64,
    pub maintenance_hours: f64,
    pub energy_consumption: f64,
}

pub struct EvaluationContext<'a> {
    pub now: DateTime<Utc>,
    pub fleet: &'a [Trainset],
    pub health_by_trainset: &'a HashMap<TrainsetId, HealthStatus>,
    pub success_predictor: &'a dyn SuccessPredictor,
    pub confidence_threshold: f64,
    /// §6: a decision touching more trainsets than this requires human
    /// approval regardless of what its own rule decided, except a critical
    /// emergency-response decision, which never requires approval (§8).
    pub max_autonomous_trainsets: usize,
}

pub fn run_all(ctx: &EvaluationContext) -> Vec<Decision> {
    let mut decisions = Vec::new();
    decisions.extend(schedule_optimization(ctx));
    decisions.extend(maintenance_scheduling(ctx));
    decisions.extend(emergency_response(ctx));
    decisions.extend(resource_allocation(ctx));

    for decision in &mut decisions {
        if decision.decision_type != DecisionType::EmergencyResponse
            && decision.affected_trainsets.len() > ctx.max_autonomous_trainsets
        {
            decision.requires_human_approval = true;
        }
    }
    decisions
}

fn within_first_minutes(now: DateTime<Utc>, minutes: u32) -> bool {
    now.minute() < minutes
}

/// *Schedule optimization* (§4.4): at local hours {6,10,14,18,22} within the
/// first five minutes, compose features and query the success model.
fn schedule_optimization(ctx: &EvaluationContext) -> Vec<Decision> {
    if !SCHEDULE_OPTIMIZATION_HOURS.contains(&ctx.now.hour()) || !within_first_minutes(ctx.now, 5) {
        return Vec::new();
    }

    let mileage_balance = mileage_balance_estimate(ctx.fleet);
    let energy_efficiency = mean_energy_efficiency(ctx.fleet);
    let maintenance_score = maintenance_score_estimate(ctx.fleet);

    let mut features: HashMap<&'static str, f64> = HashMap::new();
    features.insert("hour", ctx.now.hour() as f64);
    features.insert("weekday", ctx.now.weekday().num_days_from_monday() as f64);
    features.insert("day", ctx.now.day() as f64);
    features.insert("month", ctx.now.month() as f64);
    features.insert("trainset_count", ctx.fleet.len() as f64);
    features.insert("mileage_balance", mileage_balance);
    features.insert("energy_efficiency", energy_efficiency);
    features.insert("maintenance_score", maintenance_score);

    let outcome = ctx.success_predictor.predict(&features);
    let threshold = if ctx.confidence_threshold > 0.0 {
        ctx.confidence_threshold
    } else {
        DEFAULT_CONFIDENCE_THRESHOLD
    };

    if outcome.success_probability < threshold {
        return Vec::new();
    }

    let mut estimated_impact = HashMap::new();
    estimated_impact.insert("maintenance_hours", outcome.maintenance_hours);
    estimated_impact.insert("energy_consumption", outcome.energy_consumption);

    vec![Decision {
        id: DecisionId::new(),
        decision_type: DecisionType::ScheduleOptimization,
        urgency: Urgency::High,
        created_at: ctx.now,
        confidence: outcome.success_probability,
        rationale: format!(
            "predicted success {:.2} at or above threshold {:.2}",
            outcome.success_probability, threshold
        ),
        action_plan: ActionPlan::OptimizeSchedule { max_positions: ctx.fleet.len() },
        affected_trainsets: ctx.fleet.iter().map(|t| t.id).collect(),
        estimated_impact,
        requires_human_approval: false,
        approved: false,
        deadline: Some(ctx.now + Duration::minutes(15)),
    }]
}

/// *Maintenance scheduling* (§4.4): trainsets with next-maintenance-due
/// within 3 days, high-urgency if due within 1 day. A trainset with no
/// `next_maintenance_due` at all is a missing-data case (§7) and never
/// produces a decision, however many work orders it has pending.
fn maintenance_scheduling(ctx: &EvaluationContext) -> Vec<Decision> {
    let today = ctx.now.date_naive();
    ctx.fleet
        .iter()
        .filter(|t| t.status == TrainsetStatus::Available)
        .filter_map(|t| {
            let due = t.next_maintenance_due?;
            let days_until_maintenance = (due - today).num_days();
            if days_until_maintenance > 3 {
                return None;
            }
            let due_within_one_day = days_until_maintenance <= 1;
            Some(Decision {
                id: DecisionId::new(),
                decision_type: DecisionType::MaintenanceScheduling,
                urgency: if due_within_one_day { Urgency::High } else { Urgency::Medium },
                created_at: ctx.now,
                confidence: 0.8,
                rationale: format!("maintenance due in {days_until_maintenance} day(s)"),
                action_plan: ActionPlan::ScheduleMaintenance {
                    trainset: t.id,
                    window_hours: if due_within_one_day { 24 } else { 72 },
                },
                affected_trainsets: vec![t.id],
                estimated_impact: HashMap::new(),
                requires_human_approval: due_within_one_day,
                approved: false,
                deadline: Some(ctx.now + Duration::hours(24)),
            })
        })
        .collect()
}

/// *Emergency response* (§4.4): any trainset not already out-of-order whose
/// fitness-expiry date is today or past.
fn emergency_response(ctx: &EvaluationContext) -> Vec<Decision> {
    let today = ctx.now.date_naive();
    ctx.fleet
        .iter()
        .filter(|t| !t.is_out_of_order())
        .filter(|t| matches!(t.fitness_expiry, Some(expiry) if expiry <= today))
        .map(|t| Decision {
            id: DecisionId::new(),
            decision_type: DecisionType::EmergencyResponse,
            urgency: Urgency::Critical,
            created_at: ctx.now,
            confidence: 1.0,
            rationale: "fitness certificate expired".to_string(),
            action_plan: ActionPlan::EmergencyDeactivate { trainset: t.id },
            affected_trainsets: vec![t.id],
            estimated_impact: HashMap::new(),
            requires_human_approval: false,
            approved: false,
            deadline: Some(ctx.now + Duration::minutes(5)),
        })
        .collect()
}

/// *Resource allocation (cleaning rotation)* (§4.4): at local hour 22 within
/// the first 10 minutes, if >= 6 trainsets are available, clean the
/// ceil(available/4) least-recently-cleaned (nulls first, per §9 Open
/// Question (c)).
fn resource_allocation(ctx: &EvaluationContext) -> Vec<Decision> {
    if ctx.now.hour() != 22 || !within_first_minutes(ctx.now, 10) {
        return Vec::new();
    }

    let mut available: Vec<&Trainset> = ctx
        .fleet
        .iter()
        .filter(|t| t.status == TrainsetStatus::Available)
        .collect();

    if available.len() < 6 {
        return Vec::new();
    }

    available.sort_by(|a, b| match (a.last_cleaning, b.last_cleaning) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    });

    let count = (available.len() as f64 / 4.0).ceil() as usize;
    let selected: Vec<TrainsetId> = available.iter().take(count).map(|t| t.id).collect();

    vec![Decision {
        id: DecisionId::new(),
        decision_type: DecisionType::CleaningSchedule,
        urgency: Urgency::Medium,
        created_at: ctx.now,
        confidence: 0.9,
        rationale: format!("cleaning rotation for {} least-recently-cleaned trainsets", selected.len()),
        action_plan: ActionPlan::ScheduleCleaning { trainsets: selected.clone() },
        affected_trainsets: selected,
        estimated_impact: HashMap::new(),
        requires_human_approval: false,
        approved: false,
        deadline: Some(ctx.now + Duration::minutes(30)),
    }]
}

fn mileage_balance_estimate(fleet: &[Trainset]) -> f64 {
    if fleet.is_empty() {
        return 0.5;
    }
    let mean = crate::trainset::fleet_mean_mileage(fleet);
    if mean == 0.0 {
        return 0.5;
    }
    let deviations: Vec<f64> = fleet.iter().map(|t| (t.current_mileage_km - mean).abs() / mean).collect();
    (1.0 - crate::stats::mean(&deviations)).clamp(0.0, 1.0)
}

fn mean_energy_efficiency(fleet: &[Trainset]) -> f64 {
    if fleet.is_empty() {
        return 0.5;
    }
    crate::stats::mean(&fleet.iter().map(|t| t.energy_efficiency_score).collect::<Vec<_>>())
}

fn maintenance_score_estimate(fleet: &[Trainset]) -> f64 {
    if fleet.is_empty() {
        return 0.5;
    }
    let with_open_orders = fleet.iter().filter(|t| t.pending_work_orders > 0).count() as f64;
    1.0 - (with_open_orders / fleet.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainset::test_helpers::trainset;
    use chrono::TimeZone;

    struct AlwaysSucceeds;
    impl SuccessPredictor for AlwaysSucceeds {
        fn predict(&self, _features: &HashMap<&'static str, f64>) -> PredictedOutcome {
            PredictedOutcome {
                success_probability: 0.95,
                maintenance_hours: 2.0,
                energy_consumption: 500.0,
            }
        }
    }

    fn ctx_at<'a>(
        now: DateTime<Utc>,
        fleet: &'a [Trainset],
        predictor: &'a dyn SuccessPredictor,
        health: &'a HashMap<TrainsetId, HealthStatus>,
    ) -> EvaluationContext<'a> {
        EvaluationContext {
            now,
            fleet,
            health_by_trainset: health,
            success_predictor: predictor,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_autonomous_trainsets: 15,
        }
    }

    #[test]
    fn emergency_scenario_1_matches_expected_decision() {
        let mut ts1 = trainset("TS001", TrainsetStatus::Available);
        ts1.fitness_expiry = Some((Utc::now() - Duration::days(1)).date_naive());
        ts1.fitness_valid = false;
        let ts2 = trainset("TS002", TrainsetStatus::Available);
        let fleet = vec![ts1.clone(), ts2];
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let predictor = AlwaysSucceeds;
        let health = HashMap::new();
        let ctx = ctx_at(now, &fleet, &predictor, &health);

        let decisions = emergency_response(&ctx);
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.decision_type, DecisionType::EmergencyResponse);
        assert_eq!(d.urgency, Urgency::Critical);
        assert!((d.confidence - 1.0).abs() < 1e-9);
        assert_eq!(d.affected_trainsets, vec![ts1.id]);
        assert!(!d.requires_human_approval);
        assert_eq!(d.deadline, Some(now + Duration::minutes(5)));
    }

    #[test]
    fn cleaning_rotation_scenario_4_selects_ceil_quarter_least_recently_cleaned() {
        let fleet: Vec<_> = (0..8)
            .map(|i| {
                let mut t = trainset(&format!("TS{i}"), TrainsetStatus::Available);
                t.last_cleaning = Some(Utc::now() - Duration::days(i as i64));
                t
            })
            .collect();
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 22, 5, 0).unwrap();
        let predictor = AlwaysSucceeds;
        let health = HashMap::new();
        let ctx = ctx_at(now, &fleet, &predictor, &health);

        let decisions = resource_allocation(&ctx);
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.decision_type, DecisionType::CleaningSchedule);
        assert_eq!(d.affected_trainsets.len(), 2);
        assert_eq!(d.deadline, Some(now + Duration::minutes(30)));
        assert!(!d.requires_human_approval);
        // least-recently-cleaned = largest last_cleaning age = TS6, TS7 (i=6,7 -> oldest).
        assert!(d.affected_trainsets.contains(&fleet[6].id));
        assert!(d.affected_trainsets.contains(&fleet[7].id));
    }

    #[test]
    fn cleaning_rotation_treats_never_cleaned_as_least_recent() {
        let mut fleet: Vec<_> = (0..6)
            .map(|i| {
                let mut t = trainset(&format!("TS{i}"), TrainsetStatus::Available);
                t.last_cleaning = Some(Utc::now());
                t
            })
            .collect();
        fleet[0].last_cleaning = None;
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 22, 1, 0).unwrap();
        let predictor = AlwaysSucceeds;
        let health = HashMap::new();
        let ctx = ctx_at(now, &fleet, &predictor, &health);

        let decisions = resource_allocation(&ctx);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].affected_trainsets.contains(&fleet[0].id));
    }

    #[test]
    fn maintenance_scheduling_fires_within_three_days_and_escalates_within_one() {
        let today = Utc::now().date_naive();
        let mut due_soon = trainset("TS001", TrainsetStatus::Available);
        due_soon.next_maintenance_due = Some(today + Duration::days(2));
        let mut due_tomorrow = trainset("TS002", TrainsetStatus::Available);
        due_tomorrow.next_maintenance_due = Some(today + Duration::days(1));
        let mut due_far_out = trainset("TS003", TrainsetStatus::Available);
        due_far_out.next_maintenance_due = Some(today + Duration::days(60));
        let no_due_date = trainset("TS004", TrainsetStatus::Available);

        let fleet = vec![due_soon.clone(), due_tomorrow.clone(), due_far_out, no_due_date];
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let predictor = AlwaysSucceeds;
        let health = HashMap::new();
        let ctx = ctx_at(now, &fleet, &predictor, &health);

        let decisions = maintenance_scheduling(&ctx);
        assert_eq!(decisions.len(), 2);

        let soon = decisions.iter().find(|d| d.affected_trainsets == vec![due_soon.id]).unwrap();
        assert_eq!(soon.urgency, Urgency::Medium);
        assert!(!soon.requires_human_approval);

        let tomorrow = decisions.iter().find(|d| d.affected_trainsets == vec![due_tomorrow.id]).unwrap();
        assert_eq!(tomorrow.urgency, Urgency::High);
        assert!(tomorrow.requires_human_approval);
    }

    #[test]
    fn no_decisions_produced_outside_trigger_windows() {
        let fleet = vec![trainset("TS1", TrainsetStatus::Available)];
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 3, 30, 0).unwrap();
        let predictor = AlwaysSucceeds;
        let health = HashMap::new();
        let ctx = ctx_at(now, &fleet, &predictor, &health);
        assert!(run_all(&ctx).is_empty());
    }
}
