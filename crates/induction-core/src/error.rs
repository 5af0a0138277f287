//! Typed error surfaces for every fallible boundary in the core.
//!
//! Each component gets its own `thiserror` enum rather than one crate-wide
//! catch-all, so a caller can match on exactly the failures relevant to the
//! call it made (mirrors the per-module exception classes in the reference
//! `ai-service` implementation's routers).

use thiserror::Error;

/// Errors raised while validating or running the assignment optimizer.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("fleet is empty")]
    EmptyFleet,
    #[error("max_positions must be in [1, {ceiling}], got {requested}")]
    MaxPositionsOutOfRange { requested: usize, ceiling: usize },
    #[error("timeout_seconds must be in [5, 300], got {0}")]
    TimeoutOutOfRange(u64),
    #[error("solver reported infeasible or timed out: {0}")]
    Infeasible(String),
}

/// Errors raised by the decision engine's rule evaluation or execution dispatch.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("adapter failure while executing decision {decision_id}: {source}")]
    AdapterFailure {
        decision_id: uuid::Uuid,
        #[source]
        source: AdapterError,
    },
    #[error("no handler registered for action tag {0:?}")]
    UnknownAction(String),
}

/// Errors raised by the intelligent scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no optimizer algorithm produced a completed result")]
    AllAlgorithmsFailed,
    #[error("optimization queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

/// Errors raised by the pluggable collaborator adapters (§6).
///
/// Transient by construction: every call site that can receive one logs it
/// and records a failed outcome rather than propagating a panic or crash.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("fleet-state read failed: {0}")]
    FleetRead(String),
    #[error("status write failed: {0}")]
    StatusWrite(String),
    #[error("notification delivery failed: {0}")]
    Notify(String),
    #[error("feedback sink append failed: {0}")]
    Feedback(String),
    #[error("ml prediction call failed: {0}")]
    MlPredict(String),
}

/// Errors raised while constructing or mutating a `Configuration`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfBounds {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A coarse classification used only for the per-kind error counter in §7;
/// never consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    SolverTimeout,
    TransientAdapter,
    MissingData,
    Fatal,
}
