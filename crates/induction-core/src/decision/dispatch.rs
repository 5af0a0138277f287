//! Execution dispatch (§4.4, §9): the action plan's tag selects a handler
//! from a closed tagged union. Each handler returns `(success, details)`.

use super::{ActionPlan, Decision};
use crate::error::{AdapterError, DecisionError};

/// The narrow set of effects a decision handler can have on the outside
/// world (§6): writing trainset status and sending an emergency alert. Kept
/// separate from the fuller `adapters` traits so the decision engine only
/// depends on what it actually calls.
pub trait ActionAdapter: Send + Sync {
    fn write_status(
        &self,
        trainset: crate::trainset::TrainsetId,
        status: crate::trainset::TrainsetStatus,
        reason: &str,
    ) -> Result<(), AdapterError>;

    fn send_emergency_alert(&self, message: &str) -> Result<(), AdapterError>;

    fn request_optimization(&self, max_positions: usize) -> Result<(), AdapterError>;
}

pub fn dispatch<A: ActionAdapter>(decision: &Decision, adapter: &A) -> Result<(bool, String), DecisionError> {
    let result = match &decision.action_plan {
        ActionPlan::OptimizeSchedule { max_positions } => {
            adapter.request_optimization(*max_positions).map(|_| "optimization requested".to_string())
        }
        ActionPlan::ScheduleMaintenance { trainset, .. } => adapter
            .write_status(*trainset, crate::trainset::TrainsetStatus::Maintenance, "scheduled maintenance")
            .map(|_| "trainset sent to maintenance".to_string()),
        ActionPlan::EmergencyDeactivate { trainset } => {
            let write = adapter.write_status(
                *trainset,
                crate::trainset::TrainsetStatus::OutOfOrder,
                "emergency response: expired fitness certificate",
            );
            // Emergency alerts never block execution on delivery failure (§6).
            let _ = adapter.send_emergency_alert(&format!("trainset {trainset} withdrawn"));
            write.map(|_| "trainset withdrawn".to_string())
        }
        ActionPlan::ScheduleCleaning { trainsets } => {
            let mut failures = 0;
            for trainset in trainsets {
                if adapter
                    .write_status(*trainset, crate::trainset::TrainsetStatus::Cleaning, "cleaning rotation")
                    .is_err()
                {
                    failures += 1;
                }
            }
            if failures == 0 {
                Ok(format!("{} trainset(s) sent for cleaning", trainsets.len()))
            } else {
                Err(AdapterError::StatusWrite(format!("{failures} cleaning status write(s) failed")))
            }
        }
    };

    match result {
        Ok(details) => Ok((true, details)),
        Err(err) => Err(DecisionError::AdapterFailure {
            decision_id: decision.id.0,
            source: err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{DecisionId, DecisionType, Urgency};
    use crate::trainset::TrainsetId;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingAdapter {
        status_writes: AtomicUsize,
        fail_status: bool,
    }

    impl ActionAdapter for RecordingAdapter {
        fn write_status(
            &self,
            _trainset: TrainsetId,
            _status: crate::trainset::TrainsetStatus,
            _reason: &str,
        ) -> Result<(), AdapterError> {
            self.status_writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_status {
                Err(AdapterError::StatusWrite("injected failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn send_emergency_alert(&self, _message: &str) -> Result<(), AdapterError> {
            Ok(())
        }

        fn request_optimization(&self, _max_positions: usize) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn decision_with(plan: ActionPlan) -> Decision {
        Decision {
            id: DecisionId::new(),
            decision_type: DecisionType::EmergencyResponse,
            urgency: Urgency::Critical,
            created_at: Utc::now(),
            confidence: 1.0,
            rationale: String::new(),
            action_plan: plan,
            affected_trainsets: vec![],
            estimated_impact: HashMap::new(),
            requires_human_approval: false,
            approved: false,
            deadline: None,
        }
    }

    #[test]
    fn emergency_deactivate_writes_out_of_order_and_alerts() {
        let adapter = RecordingAdapter::default();
        let decision = decision_with(ActionPlan::EmergencyDeactivate { trainset: TrainsetId::new() });
        let (success, _) = dispatch(&decision, &adapter).unwrap();
        assert!(success);
        assert_eq!(adapter.status_writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn adapter_failure_surfaces_as_decision_error() {
        let adapter = RecordingAdapter { fail_status: true, ..Default::default() };
        let decision = decision_with(ActionPlan::EmergencyDeactivate { trainset: TrainsetId::new() });
        let err = dispatch(&decision, &adapter).unwrap_err();
        assert!(matches!(err, DecisionError::AdapterFailure { .. }));
    }
}
