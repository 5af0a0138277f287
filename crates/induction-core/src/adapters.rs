//! Pluggable collaborator adapters (§6): fleet-state reader, status writer,
//! notifier, feedback sink, and ML prediction interface. Every method
//! returns `AdapterError` rather than panicking, since the components that
//! call these are explicitly required to tolerate transient failures (§7).

use crate::error::AdapterError;
use crate::trainset::{Trainset, TrainsetId, TrainsetStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub trait FleetStateReader: Send + Sync {
    fn read_fleet(&self) -> Result<Vec<Trainset>, AdapterError>;
}

/// Metadata recorded alongside a status write (§6): who made the change,
/// why, and (for maintenance/cleaning windows) the window bounds.
#[derive(Debug, Clone)]
pub struct StatusWriteMetadata {
    pub actor: &'static str,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

pub trait StatusWriter: Send + Sync {
    /// Idempotent with respect to `(trainset, status)` within a 60-second
    /// window (§6): calling this twice in quick succession with the same
    /// target status is not an error and does not double-count.
    fn write_status(
        &self,
        trainset: TrainsetId,
        status: TrainsetStatus,
        metadata: StatusWriteMetadata,
    ) -> Result<(), AdapterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    ApprovalRequest,
    OperationalNotification,
    EmergencyAlert,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, channel: NotificationChannel, message: &str) -> Result<(), AdapterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    ScheduleGenerated,
    ScheduleExecuted,
    ScheduleDiscarded,
    DecisionOutcome,
}

#[derive(Debug, Clone)]
pub struct FeedbackRecord {
    pub schedule_id: String,
    pub timestamp: DateTime<Utc>,
    pub affected_trainsets: Vec<TrainsetId>,
    pub planned_metrics: HashMap<&'static str, f64>,
    pub actual_metrics: HashMap<&'static str, f64>,
    pub kind: FeedbackKind,
    pub success_score: f64,
    pub operator_feedback: String,
}

pub trait FeedbackSink: Send + Sync {
    fn record(&self, record: FeedbackRecord) -> Result<(), AdapterError>;
}

/// The ML prediction interface (§6) is exactly the decision engine's
/// [`crate::decision::rules::SuccessPredictor`] contract; re-exported here
/// under its external-interface name rather than duplicated.
pub use crate::decision::rules::{PredictedOutcome, SuccessPredictor as MlPredictor};

#[cfg(any(test, feature = "mock-adapters"))]
pub mod mock {
    //! In-memory adapter implementations for tests and local runs: no
    //! network or disk I/O, everything observable through a snapshot method.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockFleetReader {
        fleet: Mutex<Vec<Trainset>>,
    }

    impl MockFleetReader {
        pub fn new(fleet: Vec<Trainset>) -> Self {
            Self { fleet: Mutex::new(fleet) }
        }

        pub fn set_fleet(&self, fleet: Vec<Trainset>) {
            *self.fleet.lock().unwrap() = fleet;
        }
    }

    impl FleetStateReader for MockFleetReader {
        fn read_fleet(&self) -> Result<Vec<Trainset>, AdapterError> {
            Ok(self.fleet.lock().unwrap().clone())
        }
    }

    #[derive(Debug, Clone)]
    struct RecordedWrite {
        trainset: TrainsetId,
        status: TrainsetStatus,
        at: DateTime<Utc>,
    }

    #[derive(Default)]
    pub struct MockStatusWriter {
        writes: Mutex<Vec<RecordedWrite>>,
    }

    impl MockStatusWriter {
        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        pub fn writes(&self) -> Vec<(TrainsetId, TrainsetStatus)> {
            self.writes.lock().unwrap().iter().map(|w| (w.trainset, w.status)).collect()
        }
    }

    impl StatusWriter for MockStatusWriter {
        fn write_status(
            &self,
            trainset: TrainsetId,
            status: TrainsetStatus,
            metadata: StatusWriteMetadata,
        ) -> Result<(), AdapterError> {
            let mut writes = self.writes.lock().unwrap();
            let recent_duplicate = writes
                .iter()
                .rev()
                .take_while(|w| (metadata.timestamp - w.at).num_seconds().abs() < 60)
                .any(|w| w.trainset == trainset && w.status == status);
            if !recent_duplicate {
                writes.push(RecordedWrite { trainset, status, at: metadata.timestamp });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockNotifier {
        sent: Mutex<Vec<(NotificationChannel, String)>>,
    }

    impl MockNotifier {
        pub fn sent(&self) -> Vec<(NotificationChannel, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for MockNotifier {
        fn notify(&self, channel: NotificationChannel, message: &str) -> Result<(), AdapterError> {
            self.sent.lock().unwrap().push((channel, message.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockFeedbackSink {
        records: Mutex<Vec<FeedbackRecord>>,
    }

    impl MockFeedbackSink {
        pub fn records(&self) -> Vec<FeedbackRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl FeedbackSink for MockFeedbackSink {
        fn record(&self, record: FeedbackRecord) -> Result<(), AdapterError> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    /// Predicts success from a blend of the three composite features;
    /// missing keys fall back to the §6-documented defaults.
    pub struct HeuristicMlPredictor;

    impl MlPredictor for HeuristicMlPredictor {
        fn predict(&self, features: &HashMap<&'static str, f64>) -> PredictedOutcome {
            let mileage_balance = features.get("mileage_balance").copied().unwrap_or(0.5);
            let energy_efficiency = features.get("energy_efficiency").copied().unwrap_or(0.5);
            let maintenance_score = features.get("maintenance_score").copied().unwrap_or(0.5);
            let success_probability =
                crate::stats::mean(&[mileage_balance, energy_efficiency, maintenance_score]).clamp(0.0, 1.0);
            PredictedOutcome {
                success_probability,
                maintenance_hours: (1.0 - maintenance_score) * 10.0,
                energy_consumption: (1.0 - energy_efficiency) * 1000.0,
            }
        }
    }

    #[test]
    fn status_writer_deduplicates_within_sixty_second_window() {
        let writer = MockStatusWriter::default();
        let trainset = TrainsetId::new();
        let now = Utc::now();
        let metadata = |at: DateTime<Utc>| StatusWriteMetadata {
            actor: "test",
            reason: "test".to_string(),
            timestamp: at,
            window_start: None,
            window_end: None,
        };
        writer.write_status(trainset, TrainsetStatus::Maintenance, metadata(now)).unwrap();
        writer
            .write_status(trainset, TrainsetStatus::Maintenance, metadata(now + chrono::Duration::seconds(10)))
            .unwrap();
        assert_eq!(writer.write_count(), 1);
    }

    #[test]
    fn heuristic_predictor_uses_documented_defaults_for_missing_keys() {
        let predictor = HeuristicMlPredictor;
        let outcome = predictor.predict(&HashMap::new());
        assert!((outcome.success_probability - 0.5).abs() < 1e-9);
    }
}
