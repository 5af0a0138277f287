//! Validated runtime configuration (§6): the enumerated options every
//! component reads from, with bounds enforced at construction rather than
//! at each call site.

use crate::error::ConfigError;
use crate::scheduler::request::ScheduleTemplate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct DecisionWeights {
    pub safety: f64,
    pub efficiency: f64,
    pub cost: f64,
    pub passenger_impact: f64,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        Self { safety: 0.40, efficiency: 0.25, cost: 0.20, passenger_impact: 0.15 }
    }
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub confidence_threshold: f64,
    pub auto_execution_threshold: f64,
    pub max_autonomous_trainsets: usize,
    pub max_positions: usize,
    pub critical_hours: Vec<u32>,
    pub schedule_regen_hours: u32,
    pub schedule_templates: HashMap<&'static str, ScheduleTemplate>,
    pub weather_impact: HashMap<&'static str, f64>,
    pub decision_weights: DecisionWeights,
    /// Concurrent optimizer invocations permitted before a scheduling tick
    /// must wait for a slot (§5).
    pub max_concurrent_optimizations: usize,
    /// Callers allowed to wait for a slot once all are in use; beyond this
    /// a request fails fast with [`crate::error::SchedulerError::QueueFull`] (§5).
    pub optimization_queue_size: usize,
}

impl Configuration {
    /// Builds a configuration from explicit threshold values, validating
    /// both against their §6 bounds. Every other field keeps its documented
    /// default; use the setter methods to override them after construction.
    pub fn new(confidence_threshold: f64, auto_execution_threshold: f64) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.set_confidence_threshold(confidence_threshold)?;
        config.set_auto_execution_threshold(auto_execution_threshold)?;
        Ok(config)
    }

    pub fn set_confidence_threshold(&mut self, value: f64) -> Result<(), ConfigError> {
        validate_bounds("confidence_threshold", value, 0.70, 0.85)?;
        self.confidence_threshold = value;
        Ok(())
    }

    pub fn set_auto_execution_threshold(&mut self, value: f64) -> Result<(), ConfigError> {
        validate_bounds("auto_execution_threshold", value, 0.80, 0.95)?;
        self.auto_execution_threshold = value;
        Ok(())
    }

    pub fn set_max_positions(&mut self, value: usize) -> Result<(), ConfigError> {
        if value == 0 || value > 200 {
            return Err(ConfigError::OutOfBounds { field: "max_positions", value: value as f64, min: 1.0, max: 200.0 });
        }
        self.max_positions = value;
        Ok(())
    }

    pub fn set_max_concurrent_optimizations(&mut self, value: usize) -> Result<(), ConfigError> {
        if value == 0 || value > 64 {
            return Err(ConfigError::OutOfBounds {
                field: "max_concurrent_optimizations",
                value: value as f64,
                min: 1.0,
                max: 64.0,
            });
        }
        self.max_concurrent_optimizations = value;
        Ok(())
    }

    pub fn set_optimization_queue_size(&mut self, value: usize) -> Result<(), ConfigError> {
        if value > 200 {
            return Err(ConfigError::OutOfBounds {
                field: "optimization_queue_size",
                value: value as f64,
                min: 0.0,
                max: 200.0,
            });
        }
        self.optimization_queue_size = value;
        Ok(())
    }
}

fn validate_bounds(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfBounds { field, value, min, max });
    }
    Ok(())
}

impl Default for Configuration {
    fn default() -> Self {
        let mut weather_impact = HashMap::new();
        weather_impact.insert("sunny", 1.0);
        weather_impact.insert("cloudy", 1.0);
        weather_impact.insert("rainy", 1.15);
        weather_impact.insert("heavy_rain", 1.3);
        weather_impact.insert("stormy", 1.4);

        Self {
            confidence_threshold: 0.75,
            auto_execution_threshold: 0.85,
            max_autonomous_trainsets: 15,
            max_positions: 25,
            critical_hours: crate::scheduler::request::DEFAULT_CRITICAL_HOURS.to_vec(),
            schedule_regen_hours: 4,
            schedule_templates: crate::scheduler::request::default_templates(),
            weather_impact,
            decision_weights: DecisionWeights::default(),
            max_concurrent_optimizations: 5,
            optimization_queue_size: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_confidence_threshold_out_of_bounds() {
        let err = Configuration::new(0.5, 0.85).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfBounds { field: "confidence_threshold", .. }));
    }

    #[test]
    fn rejects_auto_execution_threshold_out_of_bounds() {
        let err = Configuration::new(0.75, 0.99).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfBounds { field: "auto_execution_threshold", .. }));
    }

    #[test]
    fn accepts_values_within_bounds() {
        let config = Configuration::new(0.80, 0.90).unwrap();
        assert!((config.confidence_threshold - 0.80).abs() < 1e-9);
        assert!((config.auto_execution_threshold - 0.90).abs() < 1e-9);
    }

    #[test]
    fn default_matches_documented_weather_multipliers() {
        let config = Configuration::default();
        assert_eq!(config.weather_impact.get("stormy").copied(), Some(1.4));
        assert_eq!(config.weather_impact.get("rainy").copied(), Some(1.15));
    }

    #[test]
    fn rejects_zero_max_concurrent_optimizations() {
        let mut config = Configuration::default();
        let err = config.set_max_concurrent_optimizations(0).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfBounds { field: "max_concurrent_optimizations", .. }));
    }

    #[test]
    fn accepts_zero_optimization_queue_size() {
        let mut config = Configuration::default();
        config.set_optimization_queue_size(0).unwrap();
        assert_eq!(config.optimization_queue_size, 0);
    }
}
