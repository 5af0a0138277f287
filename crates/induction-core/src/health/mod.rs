//! Health Assessor (§4.3): per-trainset, per-component health prediction
//! from recent telemetry, behind a pluggable rule or trained back-end.

pub mod rule_based;
pub mod telemetry;
pub mod trained;

use crate::trainset::TrainsetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use rule_based::RuleBasedAssessor;
pub use telemetry::{TelemetryRing, TelemetrySample};
pub use trained::{AnomalyDetector, FailurePredictor, FeatureScaler, TrainedAssessor};

/// Fixed component set every assessment covers (§4.3).
pub const COMPONENTS: [&str; 8] = [
    "engine",
    "brakes",
    "doors",
    "hvac",
    "battery",
    "suspension",
    "electrical",
    "communication",
];

/// Derive order doubles as the severity ranking (`Critical` is greatest) used
/// when sorting predictions and computing a fleet's worst status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn is_critical_or_poor(self) -> bool {
        matches!(self, HealthStatus::Critical | HealthStatus::Poor)
    }

    fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

impl Serialize for HealthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HealthStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "excellent" => Ok(HealthStatus::Excellent),
            "good" => Ok(HealthStatus::Good),
            "fair" => Ok(HealthStatus::Fair),
            "poor" => Ok(HealthStatus::Poor),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(serde::de::Error::custom(format!(
                "unknown health status {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthPrediction {
    pub trainset_id: TrainsetId,
    pub component: &'static str,
    pub predicted_failure_time: Option<DateTime<Utc>>,
    pub remaining_useful_life_days: u32,
    pub status: HealthStatus,
    pub urgency: f64,
    pub confidence: f64,
    pub recommended_action: String,
    pub cost_estimate: f64,
    pub risk_subscores: Vec<(&'static str, f64)>,
}

/// Worst (most severe) status across a trainset's component predictions, or
/// `None` if no predictions were produced (missing telemetry, §7).
pub fn worst_status(predictions: &[HealthPrediction]) -> Option<HealthStatus> {
    predictions.iter().map(|p| p.status).max()
}

/// Sorts predictions by urgency descending, as the §4.3 contract requires.
pub fn sort_by_urgency_desc(predictions: &mut [HealthPrediction]) {
    predictions.sort_by(|a, b| {
        b.urgency
            .partial_cmp(&a.urgency)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Back-end-agnostic contract for producing health predictions from recent
/// telemetry (§4.3). Implemented by [`RuleBasedAssessor`] (always available)
/// and [`TrainedAssessor`] (only consulted per-component when both a fitted
/// predictor and scaler are registered for it).
pub trait HealthAssessor: Send + Sync {
    fn assess(&self, trainset_id: TrainsetId, samples: &[TelemetrySample]) -> Vec<HealthPrediction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_ranks_critical_highest() {
        assert!(HealthStatus::Critical > HealthStatus::Poor);
        assert!(HealthStatus::Poor > HealthStatus::Fair);
        assert!(HealthStatus::Fair > HealthStatus::Good);
        assert!(HealthStatus::Good > HealthStatus::Excellent);
    }

    #[test]
    fn worst_status_of_empty_is_none() {
        assert!(worst_status(&[]).is_none());
    }
}
