//! Top-level service wiring (§9): the Health Assessor, Decision Engine, and
//! Intelligent Scheduler as long-lived components owned by one handle, with
//! explicit, sequenced startup (assessor → engine → scheduler) and shutdown
//! (reverse order). Mirrors the teacher's single top-level simulation
//! handle that owns every subsystem rather than relying on globals.

use crate::adapters::{
    FeedbackKind, FeedbackRecord, FeedbackSink, FleetStateReader, MlPredictor, NotificationChannel, Notifier,
    StatusWriteMetadata, StatusWriter,
};
use crate::config::Configuration;
use crate::decision::dispatch::ActionAdapter;
use crate::decision::rules::EvaluationContext;
use crate::decision::DecisionEngine;
use crate::error::{AdapterError, SchedulerError};
use crate::health::{HealthAssessor, HealthStatus};
use crate::scheduler::Scheduler;
use crate::trainset::TrainsetId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Semaphore};

/// Bridges the narrow [`ActionAdapter`] the Decision Engine dispatches
/// through to the fuller [`StatusWriter`]/[`Notifier`] adapters (§6).
/// `request_optimization` defers to the next scheduling-loop tick rather
/// than invoking the optimizer inline, since `OptimizeSchedule` decisions
/// only ever ask the scheduler to consider running sooner.
struct ServiceActionAdapter {
    status_writer: Arc<dyn StatusWriter>,
    notifier: Arc<dyn Notifier>,
}

impl ActionAdapter for ServiceActionAdapter {
    fn write_status(
        &self,
        trainset: TrainsetId,
        status: crate::trainset::TrainsetStatus,
        reason: &str,
    ) -> Result<(), AdapterError> {
        self.status_writer.write_status(
            trainset,
            status,
            StatusWriteMetadata {
                actor: "decision-engine",
                reason: reason.to_string(),
                timestamp: Utc::now(),
                window_start: None,
                window_end: None,
            },
        )
    }

    fn send_emergency_alert(&self, message: &str) -> Result<(), AdapterError> {
        self.notifier.notify(NotificationChannel::EmergencyAlert, message)
    }

    fn request_optimization(&self, max_positions: usize) -> Result<(), AdapterError> {
        tracing::info!(max_positions, "optimization requested by decision engine; deferring to next scheduling tick");
        self.notifier.notify(
            NotificationChannel::OperationalNotification,
            &format!("schedule optimization requested for up to {max_positions} positions"),
        )
    }
}

pub struct InductionService {
    config: Mutex<Configuration>,
    fleet_reader: Arc<dyn FleetStateReader>,
    status_writer: Arc<dyn StatusWriter>,
    notifier: Arc<dyn Notifier>,
    feedback_sink: Arc<dyn FeedbackSink>,
    ml_predictor: Arc<dyn MlPredictor>,
    health_assessor: Arc<dyn HealthAssessor>,
    decision_engine: Mutex<DecisionEngine>,
    scheduler: Mutex<Scheduler>,
    /// Bounds concurrent optimizer invocations (§5); permits = configured
    /// `max_concurrent_optimizations`.
    optimization_slots: Arc<Semaphore>,
    /// Callers currently waiting for a slot; compared against the
    /// configured `optimization_queue_size` so a caller beyond the bound
    /// fails fast with [`SchedulerError::QueueFull`] rather than waiting.
    queued_optimizations: AtomicUsize,
    optimization_queue_size: usize,
}

impl InductionService {
    pub fn new(
        config: Configuration,
        fleet_reader: Arc<dyn FleetStateReader>,
        status_writer: Arc<dyn StatusWriter>,
        notifier: Arc<dyn Notifier>,
        feedback_sink: Arc<dyn FeedbackSink>,
        ml_predictor: Arc<dyn MlPredictor>,
        health_assessor: Arc<dyn HealthAssessor>,
    ) -> Arc<Self> {
        tracing::info!("starting health assessor");
        tracing::info!("starting decision engine");
        tracing::info!("starting intelligent scheduler");
        let optimization_slots = Arc::new(Semaphore::new(config.max_concurrent_optimizations));
        let optimization_queue_size = config.optimization_queue_size;
        Arc::new(Self {
            config: Mutex::new(config),
            fleet_reader,
            status_writer,
            notifier,
            feedback_sink,
            ml_predictor,
            health_assessor,
            decision_engine: Mutex::new(DecisionEngine::new()),
            scheduler: Mutex::new(Scheduler::new()),
            optimization_slots,
            queued_optimizations: AtomicUsize::new(0),
            optimization_queue_size,
        })
    }

    /// Acquires a bounded optimizer slot (§5): takes one of
    /// `max_concurrent_optimizations` permits immediately if available,
    /// else joins the wait queue up to `optimization_queue_size` callers
    /// deep, else fails fast with `QueueFull`.
    async fn acquire_optimization_slot(&self) -> Result<tokio::sync::OwnedSemaphorePermit, SchedulerError> {
        if let Ok(permit) = self.optimization_slots.clone().try_acquire_owned() {
            return Ok(permit);
        }
        let queued = self.queued_optimizations.fetch_add(1, Ordering::SeqCst) + 1;
        if queued > self.optimization_queue_size {
            self.queued_optimizations.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::QueueFull { capacity: self.optimization_queue_size });
        }
        let permit = self.optimization_slots.clone().acquire_owned().await.expect("semaphore is never closed");
        self.queued_optimizations.fetch_sub(1, Ordering::SeqCst);
        Ok(permit)
    }

    fn action_adapter(&self) -> ServiceActionAdapter {
        ServiceActionAdapter { status_writer: self.status_writer.clone(), notifier: self.notifier.clone() }
    }

    /// Builds the current health-by-trainset map by running the Health
    /// Assessor's per-component predictions through `worst_status` for
    /// every available trainset (§4.3).
    async fn current_health_snapshot(&self) -> Result<HashMap<TrainsetId, HealthStatus>, AdapterError> {
        let fleet = self.fleet_reader.read_fleet()?;
        let mut health = HashMap::new();
        for trainset in &fleet {
            let predictions = self.health_assessor.assess(trainset.id, &[]);
            if let Some(status) = crate::health::worst_status(&predictions) {
                health.insert(trainset.id, status);
            }
        }
        Ok(health)
    }

    /// Decision-Engine evaluator tick (§5, every 30s).
    pub async fn decision_evaluator_tick(&self) -> Result<(), AdapterError> {
        let fleet = self.fleet_reader.read_fleet()?;
        let health = self.current_health_snapshot().await?;
        let predictor = self.ml_predictor.clone();
        let (threshold, max_autonomous_trainsets) = {
            let config = self.config.lock().await;
            (config.confidence_threshold, config.max_autonomous_trainsets)
        };

        let ctx = EvaluationContext {
            now: Utc::now(),
            fleet: &fleet,
            health_by_trainset: &health,
            success_predictor: predictor.as_ref(),
            confidence_threshold: threshold,
            max_autonomous_trainsets,
        };
        self.decision_engine.lock().await.evaluate(&ctx);
        Ok(())
    }

    /// Decision-Engine executor tick (§5, every 10s).
    pub async fn decision_executor_tick(&self) {
        let adapter = self.action_adapter();
        self.decision_engine.lock().await.execute_ready(Utc::now(), &adapter);
    }

    /// Scheduler scheduling-loop tick (§5, every 5 minutes).
    pub async fn scheduling_tick(&self, weather_conditions: &'static str, is_holiday: bool) -> Result<(), AdapterError> {
        let fleet = self.fleet_reader.read_fleet()?;
        let health = self.current_health_snapshot().await?;
        let now = Utc::now();

        let outcome = match self.acquire_optimization_slot().await {
            Ok(_permit) => {
                self.scheduler.lock().await.scheduling_tick(now, &fleet, &health, weather_conditions, is_holiday)
            }
            Err(err) => Some(Err(err)),
        };

        let Some(outcome) = outcome else {
            return Ok(());
        };

        match outcome {
            Ok((schedule, routing)) => {
                self.feedback_sink.record(FeedbackRecord {
                    schedule_id: schedule.schedule_id.clone(),
                    timestamp: now,
                    affected_trainsets: schedule.assignment.pairs().map(|(id, _)| id).collect(),
                    planned_metrics: HashMap::new(),
                    actual_metrics: HashMap::new(),
                    kind: FeedbackKind::ScheduleGenerated,
                    success_score: schedule.confidence,
                    operator_feedback: String::new(),
                })?;

                match routing {
                    crate::scheduler::Routing::AutoExecute => {
                        self.execute_schedule_plan(&schedule).await?;
                    }
                    crate::scheduler::Routing::RequestApproval => {
                        self.notifier.notify(
                            NotificationChannel::ApprovalRequest,
                            &format!("schedule {} awaiting approval (confidence {:.2})", schedule.schedule_id, schedule.confidence),
                        )?;
                    }
                    crate::scheduler::Routing::Discard => {
                        tracing::warn!(schedule_id = %schedule.schedule_id, confidence = schedule.confidence, "schedule discarded: below confidence threshold");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "scheduling tick produced no schedule");
            }
        }
        Ok(())
    }

    /// Runs the schedule's execution plan step by step (§4.5), writing each
    /// step's trainset to `in-service` in induction order.
    async fn execute_schedule_plan(&self, schedule: &crate::scheduler::GeneratedSchedule) -> Result<(), AdapterError> {
        for step in &schedule.execution_plan {
            self.status_writer.write_status(
                step.trainset,
                crate::trainset::TrainsetStatus::InService,
                StatusWriteMetadata {
                    actor: "scheduler",
                    reason: format!("auto-executed schedule {} step {}", schedule.schedule_id, step.sequence),
                    timestamp: Utc::now(),
                    window_start: None,
                    window_end: None,
                },
            )?;
        }
        Ok(())
    }

    /// Scheduler performance-monitoring tick (§5, every 15 minutes).
    pub async fn performance_monitoring_tick(&self) {
        let snapshot = self.scheduler.lock().await.performance_tick(Utc::now());
        tracing::info!(
            average_confidence = snapshot.average_confidence,
            auto_execution_rate = snapshot.auto_execution_rate,
            sample_size = snapshot.sample_size,
            "performance snapshot"
        );
    }

    /// Scheduler adaptive-learning tick (§5, every 60 minutes).
    pub async fn adaptive_learning_tick(&self) {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.adaptive_tick();
        let mut config = self.config.lock().await;
        config.confidence_threshold = scheduler.confidence_threshold();
        config.auto_execution_threshold = scheduler.auto_execution_threshold();
    }

    /// Records an execution outcome so the adaptive-learning loop can see it.
    pub async fn record_outcome(&self, success_score: f64) {
        self.scheduler.lock().await.record_outcome(success_score);
    }

    /// Spawns all five periodic loops (§5), each observing `shutdown` at the
    /// top of its tick. Returns their join handles so a caller can await a
    /// clean shutdown.
    pub fn spawn_loops(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
        weather_conditions: &'static str,
        is_holiday: bool,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        handles.push(spawn_loop(self.clone(), shutdown.clone(), std::time::Duration::from_secs(30), |svc| {
            Box::pin(async move {
                if let Err(err) = svc.decision_evaluator_tick().await {
                    tracing::warn!(error = %err, "decision evaluator tick failed");
                }
            })
        }));
        handles.push(spawn_loop(self.clone(), shutdown.clone(), std::time::Duration::from_secs(10), |svc| {
            Box::pin(async move {
                svc.decision_executor_tick().await;
            })
        }));
        handles.push(spawn_loop(self.clone(), shutdown.clone(), std::time::Duration::from_secs(300), move |svc| {
            Box::pin(async move {
                if let Err(err) = svc.scheduling_tick(weather_conditions, is_holiday).await {
                    tracing::warn!(error = %err, "scheduling tick failed");
                }
            })
        }));
        handles.push(spawn_loop(self.clone(), shutdown.clone(), std::time::Duration::from_secs(900), |svc| {
            Box::pin(async move {
                svc.performance_monitoring_tick().await;
            })
        }));
        handles.push(spawn_loop(self.clone(), shutdown.clone(), std::time::Duration::from_secs(3600), |svc| {
            Box::pin(async move {
                svc.adaptive_learning_tick().await;
            })
        }));

        shutdown.mark_unchanged();
        handles
    }
}

/// Runs `tick` on `interval`, stopping as soon as `shutdown` reports true —
/// checked both at the top of the loop and at the sleep suspension point
/// (§5). A slow tick delays but never overlaps its own next invocation
/// since each iteration awaits the previous tick's completion before
/// sleeping again.
fn spawn_loop<F>(
    service: Arc<InductionService>,
    mut shutdown: watch::Receiver<bool>,
    period: std::time::Duration,
    tick: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn(Arc<InductionService>) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            if *shutdown.borrow() {
                return;
            }
            tokio::select! {
                _ = interval.tick() => {
                    tick(service.clone()).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{HeuristicMlPredictor, MockFeedbackSink, MockFleetReader, MockNotifier, MockStatusWriter};
    use crate::health::RuleBasedAssessor;
    use crate::trainset::test_helpers::trainset;
    use crate::trainset::TrainsetStatus;

    fn service_with_fleet(fleet: Vec<crate::trainset::Trainset>) -> Arc<InductionService> {
        InductionService::new(
            Configuration::default(),
            Arc::new(MockFleetReader::new(fleet)),
            Arc::new(MockStatusWriter::default()),
            Arc::new(MockNotifier::default()),
            Arc::new(MockFeedbackSink::default()),
            Arc::new(HeuristicMlPredictor),
            Arc::new(RuleBasedAssessor),
        )
    }

    #[tokio::test]
    async fn decision_evaluator_tick_does_not_error_on_a_quiet_fleet() {
        let service = service_with_fleet(vec![trainset("TS1", TrainsetStatus::Available)]);
        service.decision_evaluator_tick().await.unwrap();
        service.decision_executor_tick().await;
    }

    #[tokio::test]
    async fn scheduling_tick_is_quiet_outside_trigger_windows_or_completes_cleanly() {
        let fleet: Vec<_> = (0..5).map(|i| trainset(&format!("TS{i}"), TrainsetStatus::Available)).collect();
        let service = service_with_fleet(fleet);
        service.scheduling_tick("sunny", false).await.unwrap();
    }

    #[tokio::test]
    async fn optimization_slot_queue_rejects_once_both_bounds_are_exhausted() {
        let mut config = Configuration::default();
        config.max_concurrent_optimizations = 1;
        config.optimization_queue_size = 0;
        let service = InductionService::new(
            config,
            Arc::new(MockFleetReader::new(vec![trainset("TS1", TrainsetStatus::Available)])),
            Arc::new(MockStatusWriter::default()),
            Arc::new(MockNotifier::default()),
            Arc::new(MockFeedbackSink::default()),
            Arc::new(HeuristicMlPredictor),
            Arc::new(RuleBasedAssessor),
        );
        let held = service.acquire_optimization_slot().await.unwrap();
        let err = service.acquire_optimization_slot().await.unwrap_err();
        assert!(matches!(err, crate::error::SchedulerError::QueueFull { capacity: 0 }));
        drop(held);
        service.acquire_optimization_slot().await.unwrap();
    }
}
