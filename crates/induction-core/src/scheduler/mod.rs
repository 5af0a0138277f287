//! Intelligent Scheduler (§4.5): the scheduling, performance-monitoring, and
//! adaptive-learning loops, plus the schedule generator and confidence
//! router they share.

pub mod confidence;
pub mod generation;
pub mod request;

use crate::error::SchedulerError;
use crate::health::HealthStatus;
use crate::history::BoundedHistory;
use crate::trainset::{Trainset, TrainsetId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub use confidence::Routing;
pub use generation::GeneratedSchedule;
pub use request::{DemandPatterns, ScheduleRequest, ScheduleTemplate, ScheduleType};

const CONFIDENCE_THRESHOLD_FLOOR: f64 = 0.70;
const CONFIDENCE_THRESHOLD_CEILING: f64 = 0.85;
const AUTO_EXECUTION_THRESHOLD_FLOOR: f64 = 0.80;
const AUTO_EXECUTION_THRESHOLD_CEILING: f64 = 0.95;
const ADAPTIVE_SUCCESS_HIGH: f64 = 0.9;
const ADAPTIVE_SUCCESS_LOW: f64 = 0.7;
const THRESHOLD_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct PerformanceSnapshot {
    pub computed_at: DateTime<Utc>,
    pub average_confidence: f64,
    pub auto_execution_rate: f64,
    pub sample_size: usize,
}

/// Owns the templates, demand model, thresholds, and history rings that back
/// the three cooperative loops. Single writer for both rings is this type,
/// mirroring the §5 resource model; outcome scores arrive via
/// [`Scheduler::record_outcome`] from whichever component observed the
/// execution result.
pub struct Scheduler {
    templates: HashMap<&'static str, ScheduleTemplate>,
    demand_patterns: DemandPatterns,
    weather_impact: HashMap<&'static str, f64>,
    scoring_weights: crate::scoring::ScoringWeights,
    confidence_threshold: f64,
    auto_execution_threshold: f64,
    generated_schedules: BoundedHistory<GeneratedSchedule>,
    performance_history: BoundedHistory<f64>,
}

impl Scheduler {
    pub fn new() -> Self {
        let mut weather_impact = HashMap::new();
        weather_impact.insert("sunny", 1.0);
        weather_impact.insert("cloudy", 1.0);
        weather_impact.insert("rainy", 1.15);
        weather_impact.insert("heavy_rain", 1.3);
        weather_impact.insert("stormy", 1.4);

        Self {
            templates: request::default_templates(),
            demand_patterns: DemandPatterns::default(),
            weather_impact,
            scoring_weights: crate::scoring::ScoringWeights::default(),
            confidence_threshold: 0.75,
            auto_execution_threshold: 0.85,
            generated_schedules: BoundedHistory::default(),
            performance_history: BoundedHistory::default(),
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn auto_execution_threshold(&self) -> f64 {
        self.auto_execution_threshold
    }

    pub fn generated_schedules(&self) -> &BoundedHistory<GeneratedSchedule> {
        &self.generated_schedules
    }

    /// Scheduling-loop tick (§4.5, every 5 minutes): if a new schedule is
    /// needed, compose the request, generate it, and route it by confidence.
    /// Returns `None` when no schedule was needed this tick.
    pub fn scheduling_tick(
        &mut self,
        now: DateTime<Utc>,
        fleet: &[Trainset],
        health_by_trainset: &HashMap<TrainsetId, HealthStatus>,
        weather_conditions: &'static str,
        is_holiday: bool,
    ) -> Option<Result<(GeneratedSchedule, Routing), SchedulerError>> {
        if !request::evaluate_scheduling_need(now, fleet, health_by_trainset, &request::DEFAULT_CRITICAL_HOURS) {
            return None;
        }

        let schedule_request = request::create_schedule_request(
            now,
            fleet,
            health_by_trainset,
            &self.demand_patterns,
            &self.templates,
            weather_conditions,
            is_holiday,
        );

        let weather_factor = self.weather_impact.get(weather_conditions).copied().unwrap_or(1.0);
        let health_map = if health_by_trainset.is_empty() { None } else { Some(health_by_trainset.clone()) };

        let outcome = generation::generate(
            fleet,
            &schedule_request,
            &health_map,
            self.scoring_weights,
            weather_factor,
            now.date_naive(),
        );

        match outcome {
            Ok(schedule) => {
                let routing = confidence::route(schedule.confidence, self.confidence_threshold, self.auto_execution_threshold);
                self.generated_schedules.push(schedule.clone());
                Some(Ok((schedule, routing)))
            }
            Err(err) => Some(Err(err)),
        }
    }

    /// Performance-monitoring loop tick (§4.5, every 15 minutes): rolling
    /// stats over the last 10 generated schedules.
    pub fn performance_tick(&self, now: DateTime<Utc>) -> PerformanceSnapshot {
        let recent = self.generated_schedules.last_n(10);
        if recent.is_empty() {
            return PerformanceSnapshot { computed_at: now, average_confidence: 0.0, auto_execution_rate: 0.0, sample_size: 0 };
        }
        let average_confidence = crate::stats::mean(&recent.iter().map(|s| s.confidence).collect::<Vec<_>>());
        let auto_executed = recent.iter().filter(|s| s.confidence >= self.auto_execution_threshold).count();
        PerformanceSnapshot {
            computed_at: now,
            average_confidence,
            auto_execution_rate: auto_executed as f64 / recent.len() as f64,
            sample_size: recent.len(),
        }
    }

    /// Records the eventual success score (0.0 or 1.0) of an executed or
    /// approved schedule, feeding the adaptive-learning loop.
    pub fn record_outcome(&mut self, success_score: f64) {
        self.performance_history.push(success_score);
    }

    /// Adaptive-learning loop tick (§4.5, every 60 minutes): over the last
    /// 20 recorded outcomes, nudge both thresholds toward the configured
    /// floor or ceiling by 0.01 depending on the observed success rate.
    pub fn adaptive_tick(&mut self) {
        let recent = self.performance_history.last_n(20);
        if recent.is_empty() {
            return;
        }
        let success_rate = crate::stats::mean(&recent.iter().map(|s| **s).collect::<Vec<_>>());

        if success_rate > ADAPTIVE_SUCCESS_HIGH {
            self.confidence_threshold = (self.confidence_threshold - THRESHOLD_STEP).max(CONFIDENCE_THRESHOLD_FLOOR);
            self.auto_execution_threshold =
                (self.auto_execution_threshold - THRESHOLD_STEP).max(AUTO_EXECUTION_THRESHOLD_FLOOR);
        } else if success_rate < ADAPTIVE_SUCCESS_LOW {
            self.confidence_threshold = (self.confidence_threshold + THRESHOLD_STEP).min(CONFIDENCE_THRESHOLD_CEILING);
            self.auto_execution_threshold =
                (self.auto_execution_threshold + THRESHOLD_STEP).min(AUTO_EXECUTION_THRESHOLD_CEILING);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
