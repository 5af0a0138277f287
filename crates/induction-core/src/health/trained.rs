//! Trained back-end (§4.3): consulted per-component only when both a fitted
//! predictor and scaler are registered for it; otherwise the rule back-end
//! is authoritative.
//!
//! The predictor, scaler, and anomaly detector are narrow traits the core
//! depends on but never fits — fitting is out of scope per the Non-goal on
//! training ML models from raw data. A production deployment plugs in
//! whatever regression/scaling library it likes behind these traits.

use super::{HealthAssessor, HealthPrediction, HealthStatus, TelemetrySample, COMPONENTS};
use crate::stats::clamp;
use crate::trainset::TrainsetId;
use std::collections::HashMap;

/// Predicts failure probability in `[0,1]` and remaining useful life (days)
/// from a feature vector for one component.
pub trait FailurePredictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> (f64, u32);
}

/// Scales a raw feature vector before it reaches a [`FailurePredictor`].
pub trait FeatureScaler: Send + Sync {
    fn scale(&self, features: &[f64]) -> Vec<f64>;
}

/// Flags whether a (scaled) feature vector is an outlier, and an anomaly
/// score in roughly `[-2, 2]` used by the urgency blend.
pub trait AnomalyDetector: Send + Sync {
    fn score(&self, features: &[f64]) -> (bool, f64);
}

struct ComponentModel {
    predictor: Box<dyn FailurePredictor>,
    scaler: Box<dyn FeatureScaler>,
}

/// Trained health assessor. Components without a registered model fall back
/// to `fallback` (normally a [`super::RuleBasedAssessor`]).
pub struct TrainedAssessor {
    models: HashMap<&'static str, ComponentModel>,
    anomaly_detector: Option<Box<dyn AnomalyDetector>>,
    fallback: Box<dyn HealthAssessor>,
}

impl TrainedAssessor {
    pub fn new(fallback: Box<dyn HealthAssessor>) -> Self {
        Self {
            models: HashMap::new(),
            anomaly_detector: None,
            fallback,
        }
    }

    pub fn register_component(
        &mut self,
        component: &'static str,
        predictor: Box<dyn FailurePredictor>,
        scaler: Box<dyn FeatureScaler>,
    ) {
        self.models.insert(component, ComponentModel { predictor, scaler });
    }

    pub fn with_anomaly_detector(mut self, detector: Box<dyn AnomalyDetector>) -> Self {
        self.anomaly_detector = Some(detector);
        self
    }

    fn extract_features(component: &'static str, latest: &TelemetrySample) -> Vec<f64> {
        match component {
            "engine" => vec![
                latest.reading("engine_temp_c").unwrap_or(0.0),
                latest.reading("engine_rpm").unwrap_or(0.0),
            ],
            "brakes" => vec![latest.reading("brake_pressure_bar").unwrap_or(0.0)],
            "battery" => vec![latest.reading("battery_voltage_v").unwrap_or(0.0)],
            _ => latest.readings.iter().map(|(_, v)| *v).collect(),
        }
    }

    fn status_from_triple(prob: f64, rul_days: u32, is_outlier: bool) -> HealthStatus {
        if is_outlier || prob > 0.8 || rul_days <= 2 {
            HealthStatus::Critical
        } else if prob > 0.6 || rul_days <= 7 {
            HealthStatus::Poor
        } else if prob > 0.4 || rul_days <= 14 {
            HealthStatus::Fair
        } else if prob > 0.2 || rul_days <= 30 {
            HealthStatus::Good
        } else {
            HealthStatus::Excellent
        }
    }

    fn urgency(prob: f64, rul_days: u32, anomaly_score: f64) -> f64 {
        let rul_term = (1.0 - rul_days as f64 / 30.0).max(0.0);
        let anomaly_term = 1.0 - (anomaly_score.abs() / 2.0);
        clamp(
            0.5 * prob + 0.3 * rul_term + 0.2 * anomaly_term,
            0.0,
            1.0,
        )
    }
}

impl HealthAssessor for TrainedAssessor {
    fn assess(&self, trainset_id: TrainsetId, samples: &[TelemetrySample]) -> Vec<HealthPrediction> {
        let Some(latest) = samples.last() else {
            return Vec::new();
        };

        let mut predictions = Vec::with_capacity(COMPONENTS.len());
        let mut uncovered = Vec::new();

        for component in COMPONENTS {
            match self.models.get(component) {
                Some(model) => {
                    let raw = Self::extract_features(component, latest);
                    let scaled = model.scaler.scale(&raw);
                    let (prob, rul_days) = model.predictor.predict(&scaled);
                    let (is_outlier, anomaly_score) = self
                        .anomaly_detector
                        .as_ref()
                        .map(|d| d.score(&scaled))
                        .unwrap_or((false, 0.0));

                    let status = Self::status_from_triple(prob, rul_days, is_outlier);
                    let urgency = Self::urgency(prob, rul_days, anomaly_score);

                    predictions.push(HealthPrediction {
                        trainset_id,
                        component,
                        predicted_failure_time: None,
                        remaining_useful_life_days: rul_days,
                        status,
                        urgency,
                        confidence: 1.0 - (anomaly_score.abs() / 4.0).min(0.4),
                        recommended_action: if status.is_critical_or_poor() {
                            "schedule maintenance".to_string()
                        } else {
                            "no action required".to_string()
                        },
                        cost_estimate: 0.0,
                        risk_subscores: vec![
                            ("failure_probability", prob),
                            ("anomaly_score", anomaly_score),
                        ],
                    });
                }
                None => uncovered.push(component),
            }
        }

        if !uncovered.is_empty() {
            let fallback_preds = self.fallback.assess(trainset_id, samples);
            predictions.extend(
                fallback_preds
                    .into_iter()
                    .filter(|p| uncovered.contains(&p.component)),
            );
        }

        super::sort_by_urgency_desc(&mut predictions);
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::RuleBasedAssessor;
    use chrono::Utc;

    struct FixedPredictor(f64, u32);
    impl FailurePredictor for FixedPredictor {
        fn predict(&self, _features: &[f64]) -> (f64, u32) {
            (self.0, self.1)
        }
    }

    struct Identity;
    impl FeatureScaler for Identity {
        fn scale(&self, features: &[f64]) -> Vec<f64> {
            features.to_vec()
        }
    }

    #[test]
    fn uncovered_components_fall_back_to_rule_based() {
        let assessor = TrainedAssessor::new(Box::new(RuleBasedAssessor));
        let sample = TelemetrySample {
            recorded_at: Utc::now(),
            readings: vec![("engine_temp_c", 95.0)],
            failure_codes: vec![],
        };
        let preds = assessor.assess(TrainsetId::new(), &[sample]);
        assert_eq!(preds.len(), COMPONENTS.len());
        let engine = preds.iter().find(|p| p.component == "engine").unwrap();
        assert_eq!(engine.status, HealthStatus::Poor); // from the rule fallback
    }

    #[test]
    fn registered_component_uses_trained_path() {
        let mut assessor = TrainedAssessor::new(Box::new(RuleBasedAssessor));
        assessor.register_component("battery", Box::new(FixedPredictor(0.9, 1)), Box::new(Identity));
        let sample = TelemetrySample {
            recorded_at: Utc::now(),
            readings: vec![("battery_voltage_v", 12.5)],
            failure_codes: vec![],
        };
        let preds = assessor.assess(TrainsetId::new(), &[sample]);
        let battery = preds.iter().find(|p| p.component == "battery").unwrap();
        assert_eq!(battery.status, HealthStatus::Critical);
    }
}
