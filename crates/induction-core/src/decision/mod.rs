//! Decision Engine (§4.4): evaluator and executor loops over a shared
//! active-decisions map, grounded in the teacher's single-writer resource
//! discipline (`matching` module owns its state; readers only snapshot).

pub mod dispatch;
pub mod rules;

use crate::error::{AdapterError, DecisionError};
use crate::history::BoundedHistory;
use crate::trainset::TrainsetId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionId(pub Uuid);

impl DecisionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DecisionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionType {
    ScheduleOptimization,
    MaintenanceScheduling,
    EmergencyResponse,
    ResourceAllocation,
    RouteAdjustment,
    CleaningSchedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// The typed action union from §9's design note: a closed tagged union with
/// one variant per dispatch handler, no open-world reflection.
#[derive(Debug, Clone)]
pub enum ActionPlan {
    OptimizeSchedule {
        max_positions: usize,
    },
    ScheduleMaintenance {
        trainset: TrainsetId,
        window_hours: u32,
    },
    EmergencyDeactivate {
        trainset: TrainsetId,
    },
    ScheduleCleaning {
        trainsets: Vec<TrainsetId>,
    },
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub id: DecisionId,
    pub decision_type: DecisionType,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
    pub confidence: f64,
    pub rationale: String,
    pub action_plan: ActionPlan,
    pub affected_trainsets: Vec<TrainsetId>,
    pub estimated_impact: HashMap<&'static str, f64>,
    pub requires_human_approval: bool,
    pub approved: bool,
    pub deadline: Option<DateTime<Utc>>,
}

impl Decision {
    /// §8 invariant: a critical-urgency emergency-response decision never
    /// requires approval.
    pub fn emergency_never_requires_approval(&self) -> bool {
        !(self.urgency == Urgency::Critical
            && self.decision_type == DecisionType::EmergencyResponse)
            || !self.requires_human_approval
    }

    /// §4.4 execution readiness: deadline not passed and (no approval
    /// required or approval has been granted).
    pub fn is_executable(&self, now: DateTime<Utc>) -> bool {
        let deadline_ok = self.deadline.map_or(true, |d| now <= d);
        let approval_ok = !self.requires_human_approval || self.approved;
        deadline_ok && approval_ok
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(false, |d| now > d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failure,
    DroppedPastDeadline,
}

#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub decision_id: DecisionId,
    pub decision_type: DecisionType,
    pub recorded_at: DateTime<Utc>,
    pub planned_metrics: HashMap<&'static str, f64>,
    pub actual_metrics: HashMap<&'static str, f64>,
    pub success_score: f64,
    pub kind: OutcomeKind,
    pub details: String,
}

/// Decision Engine state: active decisions (single writer = evaluator loop,
/// sole remover = executor loop) and the outcome history ring (§5).
pub struct DecisionEngine {
    active: HashMap<DecisionId, Decision>,
    history: BoundedHistory<OutcomeRecord>,
    error_counts: HashMap<crate::error::ErrorKind, u64>,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            history: BoundedHistory::default(),
            error_counts: HashMap::new(),
        }
    }

    pub fn active_decisions(&self) -> impl Iterator<Item = &Decision> {
        self.active.values()
    }

    pub fn active_decision(&self, id: DecisionId) -> Option<&Decision> {
        self.active.get(&id)
    }

    pub fn history(&self) -> &BoundedHistory<OutcomeRecord> {
        &self.history
    }

    /// Marks `id` approved so the next executor tick can dispatch it (§3:
    /// "awaits explicit approval"). Returns `false` if no such decision is
    /// active. This is the only external mutation of an active decision;
    /// it does not bypass the deadline check in `is_executable`.
    pub fn approve(&mut self, id: DecisionId) -> bool {
        match self.active.get_mut(&id) {
            Some(decision) => {
                decision.approved = true;
                true
            }
            None => false,
        }
    }

    pub fn error_count(&self, kind: crate::error::ErrorKind) -> u64 {
        self.error_counts.get(&kind).copied().unwrap_or(0)
    }

    fn record_error(&mut self, kind: crate::error::ErrorKind) {
        *self.error_counts.entry(kind).or_insert(0) += 1;
    }

    /// Evaluator loop tick (§4.4, every 30s): runs all four rule evaluators
    /// against the fleet snapshot and inserts any new decisions.
    pub fn evaluate(&mut self, ctx: &rules::EvaluationContext) {
        for decision in rules::run_all(ctx) {
            self.active.insert(decision.id, decision);
        }
    }

    /// Executor loop tick (§4.4, every 10s): advances active decisions.
    /// Past-deadline decisions are dropped unexecuted (the only silent
    /// discard path, logged here at the call site via `tracing::warn!`);
    /// executable decisions are dispatched and their outcome recorded.
    pub fn execute_ready<A: dispatch::ActionAdapter>(&mut self, now: DateTime<Utc>, adapter: &A) {
        let ready: Vec<DecisionId> = self
            .active
            .iter()
            .filter(|(_, d)| d.is_past_deadline(now) || d.is_executable(now))
            .map(|(id, _)| *id)
            .collect();

        for id in ready {
            let Some(decision) = self.active.remove(&id) else {
                continue;
            };

            if decision.is_past_deadline(now) {
                tracing::warn!(decision_id = ?decision.id.0, "decision dropped past deadline");
                self.history.push(OutcomeRecord {
                    decision_id: decision.id,
                    decision_type: decision.decision_type,
                    recorded_at: now,
                    planned_metrics: HashMap::new(),
                    actual_metrics: HashMap::new(),
                    success_score: 0.0,
                    kind: OutcomeKind::DroppedPastDeadline,
                    details: "dropped past deadline".to_string(),
                });
                continue;
            }

            let outcome = match dispatch::dispatch(&decision, adapter) {
                Ok((success, details)) => OutcomeRecord {
                    decision_id: decision.id,
                    decision_type: decision.decision_type,
                    recorded_at: now,
                    planned_metrics: decision.estimated_impact.clone(),
                    actual_metrics: HashMap::new(),
                    success_score: if success { 1.0 } else { 0.0 },
                    kind: if success { OutcomeKind::Success } else { OutcomeKind::Failure },
                    details,
                },
                Err(err) => {
                    self.record_error(classify_decision_error(&err));
                    tracing::warn!(decision_id = ?decision.id.0, error = %err, "decision execution failed");
                    OutcomeRecord {
                        decision_id: decision.id,
                        decision_type: decision.decision_type,
                        recorded_at: now,
                        planned_metrics: decision.estimated_impact.clone(),
                        actual_metrics: HashMap::new(),
                        success_score: 0.0,
                        kind: OutcomeKind::Failure,
                        details: err.to_string(),
                    }
                }
            };
            self.history.push(outcome);
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_decision_error(err: &DecisionError) -> crate::error::ErrorKind {
    match err {
        DecisionError::AdapterFailure { source, .. } => match source {
            AdapterError::FleetRead(_)
            | AdapterError::StatusWrite(_)
            | AdapterError::Notify(_)
            | AdapterError::Feedback(_)
            | AdapterError::MlPredict(_) => crate::error::ErrorKind::TransientAdapter,
        },
        DecisionError::UnknownAction(_) => crate::error::ErrorKind::Validation,
    }
}
