mod support;

use chrono::{TimeZone, Utc};
use induction_core::adapters::mock::HeuristicMlPredictor;
use induction_core::decision::dispatch::ActionAdapter;
use induction_core::decision::rules::EvaluationContext;
use induction_core::decision::{DecisionEngine, DecisionType, Urgency};
use induction_core::error::AdapterError;
use induction_core::trainset::{TrainsetId, TrainsetStatus};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingAdapter {
    writes: Mutex<Vec<(TrainsetId, TrainsetStatus)>>,
    alerts: Mutex<Vec<String>>,
}

impl ActionAdapter for RecordingAdapter {
    fn write_status(&self, trainset: TrainsetId, status: TrainsetStatus, _reason: &str) -> Result<(), AdapterError> {
        self.writes.lock().unwrap().push((trainset, status));
        Ok(())
    }

    fn send_emergency_alert(&self, message: &str) -> Result<(), AdapterError> {
        self.alerts.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn request_optimization(&self, _max_positions: usize) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// §8 scenario 1: one trainset with an expired fitness certificate is
/// immediately withdrawn, the other untouched.
#[test]
fn emergency_expired_fitness_withdraws_only_the_expired_trainset() {
    let mut ts001 = support::trainset("TS001", TrainsetStatus::Available);
    ts001.fitness_expiry = Some(Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap().date_naive());
    let ts002 = support::trainset("TS002", TrainsetStatus::Available);
    let fleet = vec![ts001.clone(), ts002.clone()];

    let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
    let health = HashMap::new();
    let predictor = HeuristicMlPredictor;
    let ctx = EvaluationContext {
        now,
        fleet: &fleet,
        health_by_trainset: &health,
        success_predictor: &predictor,
        confidence_threshold: 0.75,
        max_autonomous_trainsets: 15,
    };

    let mut engine = DecisionEngine::new();
    engine.evaluate(&ctx);

    let decisions: Vec<_> = engine.active_decisions().collect();
    let emergency: Vec<_> = decisions.iter().filter(|d| d.decision_type == DecisionType::EmergencyResponse).collect();
    assert_eq!(emergency.len(), 1);
    let decision = emergency[0];
    assert_eq!(decision.urgency, Urgency::Critical);
    assert!((decision.confidence - 1.0).abs() < 1e-9);
    assert_eq!(decision.affected_trainsets, vec![ts001.id]);
    assert!(!decision.requires_human_approval);
    assert_eq!(decision.deadline, Some(now + chrono::Duration::minutes(5)));

    let adapter = RecordingAdapter::default();
    engine.execute_ready(now, &adapter);

    let writes = adapter.writes.lock().unwrap();
    assert_eq!(writes.as_slice(), &[(ts001.id, TrainsetStatus::OutOfOrder)]);
    assert!(!adapter.alerts.lock().unwrap().is_empty());
    assert_eq!(engine.active_decisions().count(), 0);
}
