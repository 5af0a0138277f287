//! Confidence composition and auto-execute / approval / discard routing (§4.5).

use crate::optimizer::{AlgorithmKind, OptimizationResult};
use crate::stats::mean;

use super::generation::{PerformanceMetrics, RiskAssessment};

pub const OPTIMIZATION_QUALITY_WEIGHT: f64 = 0.25;
pub const DATA_COMPLETENESS_WEIGHT: f64 = 0.15;
pub const ALGORITHM_RELIABILITY_WEIGHT: f64 = 0.10;
pub const MEAN_PERFORMANCE_WEIGHT: f64 = 0.30;
pub const RISK_INVERSE_WEIGHT: f64 = 0.20;

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceFactors {
    pub optimization_quality: f64,
    pub data_completeness: f64,
    pub algorithm_reliability: f64,
    pub mean_performance: f64,
    pub risk_inverse: f64,
}

impl ConfidenceFactors {
    pub fn compose(
        result: &OptimizationResult,
        eligible_count: usize,
        performance: &PerformanceMetrics,
        risk: &RiskAssessment,
    ) -> Self {
        Self {
            optimization_quality: (result.score / 1000.0).clamp(0.0, 1.0),
            data_completeness: (eligible_count as f64 / 10.0).min(1.0),
            algorithm_reliability: result.algorithm.reliability(),
            mean_performance: mean(&performance.as_slice()),
            risk_inverse: 1.0 - risk.overall,
        }
    }

    pub fn confidence(self) -> f64 {
        self.optimization_quality * OPTIMIZATION_QUALITY_WEIGHT
            + self.data_completeness * DATA_COMPLETENESS_WEIGHT
            + self.algorithm_reliability * ALGORITHM_RELIABILITY_WEIGHT
            + self.mean_performance * MEAN_PERFORMANCE_WEIGHT
            + self.risk_inverse * RISK_INVERSE_WEIGHT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    AutoExecute,
    RequestApproval,
    Discard,
}

pub fn route(confidence: f64, confidence_threshold: f64, auto_execution_threshold: f64) -> Routing {
    if confidence >= auto_execution_threshold {
        Routing::AutoExecute
    } else if confidence >= confidence_threshold {
        Routing::RequestApproval
    } else {
        Routing::Discard
    }
}

/// Algorithm-reliability contribution alone, for callers that only need
/// that one factor (e.g. a quick health-check of a cached result).
pub fn algorithm_reliability(algorithm: AlgorithmKind) -> f64 {
    algorithm.reliability()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;
    use crate::optimizer::CompletionStatus;
    use std::collections::HashMap;
    use std::time::Duration;

    fn result(score: f64, algorithm: AlgorithmKind) -> OptimizationResult {
        OptimizationResult {
            assignment: Assignment::new(),
            score,
            algorithm,
            execution_time: Duration::from_millis(1),
            reasoning: HashMap::new(),
            constraint_violations: 0,
            status: CompletionStatus::Completed,
        }
    }

    #[test]
    fn routing_picks_auto_execute_above_threshold() {
        assert_eq!(route(0.9, 0.75, 0.85), Routing::AutoExecute);
        assert_eq!(route(0.8, 0.75, 0.85), Routing::RequestApproval);
        assert_eq!(route(0.5, 0.75, 0.85), Routing::Discard);
    }

    #[test]
    fn confidence_is_bounded_by_its_weights() {
        let perf = PerformanceMetrics {
            efficiency: 1.0,
            reliability: 1.0,
            energy_efficiency: 1.0,
            passenger_satisfaction: 1.0,
            maintenance_optimality: 1.0,
            cost_effectiveness: 1.0,
        };
        let risk = RiskAssessment { operational: 0.0, maintenance: 0.0, weather: 0.0, demand_mismatch: 0.0, overall: 0.0 };
        let factors = ConfidenceFactors::compose(&result(1000.0, AlgorithmKind::Exact), 20, &perf, &risk);
        let confidence = factors.confidence();
        assert!((confidence - 1.0).abs() < 1e-9, "got {confidence}");
    }
}
