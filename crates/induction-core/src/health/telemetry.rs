//! Telemetry retention: last 30 days per trainset, at most the last 100
//! samples admitted into one analysis (§4.3).
//!
//! Grounded in the teacher's `telemetry.rs` resource-per-stream idea, but a
//! flat `Vec` there was scoped to one simulation run; here the ring must
//! evict by both age and count since the service runs indefinitely.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Maximum telemetry age retained per trainset.
pub const RETENTION: Duration = Duration::days(30);
/// Maximum samples admitted into a single health assessment.
pub const MAX_SAMPLES_PER_ANALYSIS: usize = 100;

#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub recorded_at: DateTime<Utc>,
    /// Named readings, e.g. "engine_temp_c", "brake_pressure_bar", "battery_voltage_v".
    pub readings: Vec<(&'static str, f64)>,
    /// Failure codes raised by onboard diagnostics, tagged with the component they affect.
    pub failure_codes: Vec<&'static str>,
}

impl TelemetrySample {
    pub fn reading(&self, key: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn has_failure_code_for(&self, component: &str) -> bool {
        self.failure_codes.iter().any(|c| *c == component)
    }
}

/// Single-writer ring of telemetry samples for one trainset (§5: the
/// telemetry ingestor is the sole writer; the Health Assessor only reads).
#[derive(Debug, Default)]
pub struct TelemetryRing {
    samples: VecDeque<TelemetrySample>,
}

impl TelemetryRing {
    pub fn push(&mut self, sample: TelemetrySample, now: DateTime<Utc>) {
        self.samples.push_back(sample);
        self.evict_expired(now);
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        while let Some(front) = self.samples.front() {
            if now.signed_duration_since(front.recorded_at) > RETENTION {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// The most recent samples admitted into one analysis, newest last,
    /// capped at [`MAX_SAMPLES_PER_ANALYSIS`].
    pub fn recent_for_analysis(&self) -> Vec<TelemetrySample> {
        let skip = self.samples.len().saturating_sub(MAX_SAMPLES_PER_ANALYSIS);
        self.samples.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.back()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(now: DateTime<Utc>, age_days: i64) -> TelemetrySample {
        TelemetrySample {
            recorded_at: now - Duration::days(age_days),
            readings: vec![],
            failure_codes: vec![],
        }
    }

    #[test]
    fn evicts_samples_older_than_retention() {
        let mut ring = TelemetryRing::default();
        let now = Utc::now();
        ring.push(sample_at(now, 40), now);
        ring.push(sample_at(now, 1), now);
        assert_eq!(ring.recent_for_analysis().len(), 1);
    }

    #[test]
    fn caps_analysis_window_at_100_samples() {
        let mut ring = TelemetryRing::default();
        let now = Utc::now();
        for i in 0..150 {
            ring.push(sample_at(now, 0), now + Duration::seconds(i));
        }
        assert_eq!(ring.recent_for_analysis().len(), MAX_SAMPLES_PER_ANALYSIS);
    }
}
