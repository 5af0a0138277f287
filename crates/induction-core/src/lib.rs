//! Decision and scheduling core for metro train induction planning.
//!
//! Three cooperating subsystems share one fleet snapshot and one scoring
//! function: the Assignment Optimizer (exact, population, and local-search
//! drivers over a shared objective), the Decision Engine (rule evaluators
//! and execution dispatch), and the Intelligent Scheduler (periodic
//! schedule generation, confidence scoring, and auto-execute routing).
//! [`service::InductionService`] wires the three together behind the
//! external-interface traits in [`adapters`].

pub mod adapters;
pub mod assignment;
pub mod config;
pub mod decision;
pub mod error;
pub mod health;
pub mod history;
pub mod optimizer;
pub mod scheduler;
pub mod scoring;
pub mod service;
pub mod stats;
pub mod trainset;

pub use assignment::Assignment;
pub use config::Configuration;
pub use error::{AdapterError, ConfigError, DecisionError, ErrorKind, OptimizerError, SchedulerError};
pub use service::InductionService;
pub use trainset::{Trainset, TrainsetId, TrainsetStatus};
