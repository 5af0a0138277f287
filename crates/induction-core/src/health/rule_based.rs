//! Rule back-end (§4.3): fixed thresholds on the latest telemetry sample.
//! Always available; confidence fixed at 0.6 since it never fits to data.

use super::{HealthAssessor, HealthPrediction, HealthStatus, TelemetrySample, COMPONENTS};
use crate::trainset::TrainsetId;

const RULE_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Default)]
pub struct RuleBasedAssessor;

impl RuleBasedAssessor {
    fn assess_component(
        &self,
        trainset_id: TrainsetId,
        component: &'static str,
        latest: &TelemetrySample,
    ) -> HealthPrediction {
        let status = match component {
            "engine" => match latest.reading("engine_temp_c") {
                Some(t) if t > 90.0 => HealthStatus::Poor,
                Some(t) if t > 80.0 => HealthStatus::Fair,
                _ => HealthStatus::Good,
            },
            "brakes" => match latest.reading("brake_pressure_bar") {
                Some(p) if p < 0.7 => HealthStatus::Poor,
                _ => HealthStatus::Good,
            },
            "battery" => match latest.reading("battery_voltage_v") {
                Some(v) if v < 11.5 => HealthStatus::Critical,
                Some(v) if v < 12.0 => HealthStatus::Poor,
                _ => HealthStatus::Good,
            },
            _ => HealthStatus::Good,
        };

        let status = if latest.has_failure_code_for(component) {
            HealthStatus::Critical
        } else {
            status
        };

        let urgency = match status {
            HealthStatus::Critical => 1.0,
            HealthStatus::Poor => 0.75,
            HealthStatus::Fair => 0.4,
            HealthStatus::Good => 0.1,
            HealthStatus::Excellent => 0.0,
        };

        let recommended_action = match status {
            HealthStatus::Critical => "withdraw immediately for inspection".to_string(),
            HealthStatus::Poor => "schedule maintenance within 3 days".to_string(),
            HealthStatus::Fair => "monitor; schedule routine check".to_string(),
            _ => "no action required".to_string(),
        };

        HealthPrediction {
            trainset_id,
            component,
            predicted_failure_time: None,
            remaining_useful_life_days: match status {
                HealthStatus::Critical => 1,
                HealthStatus::Poor => 7,
                HealthStatus::Fair => 30,
                _ => 90,
            },
            status,
            urgency,
            confidence: RULE_CONFIDENCE,
            recommended_action,
            cost_estimate: 0.0,
            risk_subscores: vec![("rule_threshold", urgency)],
        }
    }
}

impl HealthAssessor for RuleBasedAssessor {
    fn assess(&self, trainset_id: TrainsetId, samples: &[TelemetrySample]) -> Vec<HealthPrediction> {
        let Some(latest) = samples.last() else {
            return Vec::new();
        };
        let mut predictions: Vec<_> = COMPONENTS
            .iter()
            .map(|c| self.assess_component(trainset_id, c, latest))
            .collect();
        super::sort_by_urgency_desc(&mut predictions);
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(readings: Vec<(&'static str, f64)>) -> TelemetrySample {
        TelemetrySample {
            recorded_at: Utc::now(),
            readings,
            failure_codes: vec![],
        }
    }

    #[test]
    fn no_samples_yields_no_predictions() {
        let assessor = RuleBasedAssessor;
        assert!(assessor.assess(TrainsetId::new(), &[]).is_empty());
    }

    #[test]
    fn low_battery_voltage_is_critical() {
        let assessor = RuleBasedAssessor;
        let preds = assessor.assess(
            TrainsetId::new(),
            &[sample(vec![("battery_voltage_v", 11.0)])],
        );
        let battery = preds.iter().find(|p| p.component == "battery").unwrap();
        assert_eq!(battery.status, HealthStatus::Critical);
        assert_eq!(preds[0].component, "battery");
    }

    #[test]
    fn hot_engine_is_poor() {
        let assessor = RuleBasedAssessor;
        let preds = assessor.assess(TrainsetId::new(), &[sample(vec![("engine_temp_c", 95.0)])]);
        let engine = preds.iter().find(|p| p.component == "engine").unwrap();
        assert_eq!(engine.status, HealthStatus::Poor);
        assert!((engine.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn failure_code_forces_critical_regardless_of_thresholds() {
        let assessor = RuleBasedAssessor;
        let mut s = sample(vec![("engine_temp_c", 20.0)]);
        s.failure_codes.push("engine");
        let preds = assessor.assess(TrainsetId::new(), &[s]);
        let engine = preds.iter().find(|p| p.component == "engine").unwrap();
        assert_eq!(engine.status, HealthStatus::Critical);
    }
}
