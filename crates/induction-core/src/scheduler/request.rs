//! Schedule-request composition (§4.5): schedule-need predicate, schedule-type
//! derivation, demand prediction, and constraint building.

use crate::health::HealthStatus;
use crate::trainset::{Trainset, TrainsetId, TrainsetStatus};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleType {
    PeakHour,
    OffPeak,
    NightService,
    Weekend,
    MaintenanceWindow,
    EmergencyResponse,
    Holiday,
}

impl ScheduleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleType::PeakHour => "peak_hour",
            ScheduleType::OffPeak => "off_peak",
            ScheduleType::NightService => "night_service",
            ScheduleType::Weekend => "weekend",
            ScheduleType::MaintenanceWindow => "maintenance_window",
            ScheduleType::EmergencyResponse => "emergency_response",
            ScheduleType::Holiday => "holiday",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePriority {
    PassengerComfort,
    Efficiency,
    EnergySavings,
    MaintenanceOptimization,
    CostReduction,
}

/// Derives the active schedule type from the local hour and weekday.
///
/// Reproduced literally from the reference scheduler's `elif` chain: the
/// night-service window (`hour >= 22 or hour < 6`) is checked before
/// maintenance-window (`1 <= hour < 5`), so the latter can never trigger —
/// hour 1..5 is already consumed by night-service. Kept as-is rather than
/// reordered, since the original exhibits the identical dead branch.
pub fn determine_schedule_type(now: DateTime<Utc>) -> ScheduleType {
    let hour = now.hour();
    let weekday = now.weekday().num_days_from_monday();

    if weekday >= 5 {
        return ScheduleType::Weekend;
    }
    if (6..10).contains(&hour) || (17..21).contains(&hour) {
        return ScheduleType::PeakHour;
    }
    if hour >= 22 || hour < 6 {
        return ScheduleType::NightService;
    }
    if (1..5).contains(&hour) {
        return ScheduleType::MaintenanceWindow;
    }
    ScheduleType::OffPeak
}

/// Layers emergency and holiday context on top of the plain time-derived
/// type: an active emergency condition always wins, then an explicit
/// holiday flag, else the ordinary hour/weekday derivation above.
pub fn classify_schedule_type(now: DateTime<Utc>, is_holiday: bool, emergency: bool) -> ScheduleType {
    if emergency {
        ScheduleType::EmergencyResponse
    } else if is_holiday {
        ScheduleType::Holiday
    } else {
        determine_schedule_type(now)
    }
}

pub fn determine_schedule_priority(schedule_type: ScheduleType) -> SchedulePriority {
    match schedule_type {
        ScheduleType::PeakHour => SchedulePriority::PassengerComfort,
        ScheduleType::NightService => SchedulePriority::EnergySavings,
        ScheduleType::MaintenanceWindow => SchedulePriority::MaintenanceOptimization,
        ScheduleType::OffPeak => SchedulePriority::Efficiency,
        ScheduleType::Weekend | ScheduleType::EmergencyResponse | ScheduleType::Holiday => SchedulePriority::CostReduction,
    }
}

/// Hours at which the scheduling-need predicate fires regardless of the
/// every-4-hours rule (§4.5).
pub const DEFAULT_CRITICAL_HOURS: [u32; 8] = [5, 6, 9, 12, 16, 17, 20, 22];

/// Evaluates whether a new schedule needs to be generated right now.
pub fn evaluate_scheduling_need(
    now: DateTime<Utc>,
    fleet: &[Trainset],
    health_by_trainset: &HashMap<TrainsetId, HealthStatus>,
    critical_hours: &[u32],
) -> bool {
    let hour = now.hour();
    let minute = now.minute();

    if critical_hours.contains(&hour) && minute < 10 {
        return true;
    }
    if emergency_rescheduling_needed(now, fleet, health_by_trainset) {
        return true;
    }
    hour % 4 == 0 && minute < 10
}

/// (a) more than 20% of available trainsets have poor/critical health, or
/// (b) any available trainset's fitness certificate has already expired.
fn emergency_rescheduling_needed(
    now: DateTime<Utc>,
    fleet: &[Trainset],
    health_by_trainset: &HashMap<TrainsetId, HealthStatus>,
) -> bool {
    let available: Vec<&Trainset> = fleet.iter().filter(|t| t.status == TrainsetStatus::Available).collect();
    if available.is_empty() {
        return false;
    }

    let critical_count = available
        .iter()
        .filter(|t| health_by_trainset.get(&t.id).is_some_and(|h| h.is_critical_or_poor()))
        .count();
    if critical_count as f64 > available.len() as f64 * 0.2 {
        return true;
    }

    let today = now.date_naive();
    available.iter().any(|t| matches!(t.fitness_expiry, Some(expiry) if expiry <= today))
}

/// Per-hour demand index in `[0, 1]`, 24 entries, weekday/weekend/holiday.
#[derive(Debug, Clone)]
pub struct DemandPatterns {
    pub weekday_peak: [f64; 24],
    pub weekend: [f64; 24],
    pub holiday: [f64; 24],
}

impl Default for DemandPatterns {
    fn default() -> Self {
        Self {
            weekday_peak: [
                0.2, 0.3, 0.6, 0.8, 0.9, 1.0, 0.8, 0.6, 0.4, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 0.8, 0.6, 0.4,
                0.3, 0.2, 0.1, 0.1,
            ],
            weekend: [
                0.1, 0.1, 0.1, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3,
                0.2, 0.2, 0.1, 0.1,
            ],
            holiday: [
                0.1, 0.1, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.0, 1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4,
                0.3, 0.2, 0.1, 0.1,
            ],
        }
    }
}

/// Predicted passenger demand for `now`, scaled by a 15-trainset capacity
/// factor and 1000 passengers per trainset (§4.5). A holiday consults the
/// holiday pattern ahead of the weekday/weekend split.
pub fn predict_passenger_demand(now: DateTime<Utc>, patterns: &DemandPatterns, is_holiday: bool) -> u64 {
    let weekday = now.weekday().num_days_from_monday();
    let hour = now.hour() as usize;

    let base_demand = if is_holiday {
        patterns.holiday[hour]
    } else if weekday < 5 {
        patterns.weekday_peak[hour]
    } else if weekday == 5 {
        patterns.weekend[hour]
    } else {
        patterns.weekend[hour] * 0.8
    };

    (base_demand * 15.0 * 1000.0) as u64
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleTemplate {
    pub min_trainsets: usize,
    pub max_trainsets: usize,
    pub frequency_minutes: u32,
}

fn template_key(schedule_type: ScheduleType, now: DateTime<Utc>) -> &'static str {
    match schedule_type {
        ScheduleType::PeakHour => {
            if now.hour() < 12 {
                "peak_morning"
            } else {
                "peak_evening"
            }
        }
        ScheduleType::OffPeak => "off_peak",
        ScheduleType::NightService => "night_service",
        ScheduleType::Weekend => "weekend",
        ScheduleType::MaintenanceWindow => "maintenance_window",
        // Neither has a dedicated template (§4.5 names only the five
        // standard windows); emergency response borrows the most
        // conservative template and holiday the other non-workday one.
        ScheduleType::EmergencyResponse => "maintenance_window",
        ScheduleType::Holiday => "weekend",
    }
}

/// The six named templates from the reference scheduler's template table.
pub fn default_templates() -> HashMap<&'static str, ScheduleTemplate> {
    let mut templates = HashMap::new();
    templates.insert("peak_morning", ScheduleTemplate { min_trainsets: 18, max_trainsets: 25, frequency_minutes: 3 });
    templates.insert("peak_evening", ScheduleTemplate { min_trainsets: 18, max_trainsets: 25, frequency_minutes: 3 });
    templates.insert("off_peak", ScheduleTemplate { min_trainsets: 10, max_trainsets: 15, frequency_minutes: 8 });
    templates.insert(
        "night_service",
        ScheduleTemplate { min_trainsets: 5, max_trainsets: 8, frequency_minutes: 15 },
    );
    templates.insert("weekend", ScheduleTemplate { min_trainsets: 8, max_trainsets: 15, frequency_minutes: 10 });
    templates.insert(
        "maintenance_window",
        ScheduleTemplate { min_trainsets: 3, max_trainsets: 8, frequency_minutes: 30 },
    );
    templates
}

pub fn energy_limit_kwh(schedule_type: ScheduleType) -> f64 {
    match schedule_type {
        ScheduleType::PeakHour => 150.0,
        ScheduleType::OffPeak => 120.0,
        ScheduleType::NightService => 80.0,
        ScheduleType::Weekend => 100.0,
        ScheduleType::MaintenanceWindow => 60.0,
        ScheduleType::EmergencyResponse => 60.0,
        ScheduleType::Holiday => 100.0,
    }
}

pub fn cost_limit(schedule_type: ScheduleType) -> f64 {
    match schedule_type {
        ScheduleType::PeakHour => 5000.0,
        ScheduleType::OffPeak => 3000.0,
        ScheduleType::NightService => 2000.0,
        ScheduleType::Weekend => 3500.0,
        ScheduleType::MaintenanceWindow => 1500.0,
        ScheduleType::EmergencyResponse => 1500.0,
        ScheduleType::Holiday => 3500.0,
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConstraints {
    pub min_trainsets: usize,
    pub max_trainsets: usize,
    pub eligible: Vec<TrainsetId>,
    pub excluded: Vec<TrainsetId>,
    pub priority: SchedulePriority,
    pub frequency_minutes: u32,
    pub energy_limit: f64,
    pub cost_limit: f64,
}

/// Builds the constraint set for `schedule_type` at `now`: intersects the
/// template's bounds with the currently-eligible (available, non-critical)
/// trainsets (§4.5).
pub fn build_constraints(
    schedule_type: ScheduleType,
    now: DateTime<Utc>,
    fleet: &[Trainset],
    health_by_trainset: &HashMap<TrainsetId, HealthStatus>,
    templates: &HashMap<&'static str, ScheduleTemplate>,
) -> ScheduleConstraints {
    let key = template_key(schedule_type, now);
    let template = templates.get(key).copied().unwrap_or(ScheduleTemplate {
        min_trainsets: 10,
        max_trainsets: 15,
        frequency_minutes: 8,
    });

    let available: Vec<&Trainset> = fleet.iter().filter(|t| t.status == TrainsetStatus::Available).collect();
    let excluded: Vec<TrainsetId> = available
        .iter()
        .filter(|t| health_by_trainset.get(&t.id).is_some_and(|h| h.is_critical_or_poor()))
        .map(|t| t.id)
        .collect();
    let eligible: Vec<TrainsetId> = available
        .iter()
        .filter(|t| !health_by_trainset.get(&t.id).is_some_and(|h| h.is_critical_or_poor()))
        .map(|t| t.id)
        .collect();

    ScheduleConstraints {
        min_trainsets: template.min_trainsets.max(eligible.len() / 3),
        max_trainsets: template.max_trainsets.min(eligible.len()),
        eligible,
        excluded,
        priority: determine_schedule_priority(schedule_type),
        frequency_minutes: template.frequency_minutes,
        energy_limit: energy_limit_kwh(schedule_type),
        cost_limit: cost_limit(schedule_type),
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub schedule_id: String,
    pub schedule_type: ScheduleType,
    pub generated_at: DateTime<Utc>,
    pub priority: SchedulePriority,
    pub constraints: ScheduleConstraints,
    pub expected_demand: u64,
    pub weather_conditions: &'static str,
}

/// Composes a full schedule request from the current instant and fleet
/// state. `is_holiday` is an external calendar flag; an emergency condition
/// (§4.5's poor-health/expired-fitness predicate) overrides it.
pub fn create_schedule_request(
    now: DateTime<Utc>,
    fleet: &[Trainset],
    health_by_trainset: &HashMap<TrainsetId, HealthStatus>,
    patterns: &DemandPatterns,
    templates: &HashMap<&'static str, ScheduleTemplate>,
    weather_conditions: &'static str,
    is_holiday: bool,
) -> ScheduleRequest {
    let emergency = emergency_rescheduling_needed(now, fleet, health_by_trainset);
    let schedule_type = classify_schedule_type(now, is_holiday, emergency);
    let constraints = build_constraints(schedule_type, now, fleet, health_by_trainset, templates);

    ScheduleRequest {
        schedule_id: format!("AUTO_{}_{}", schedule_type.as_str(), now.timestamp()),
        schedule_type,
        generated_at: now,
        priority: determine_schedule_priority(schedule_type),
        constraints,
        expected_demand: predict_passenger_demand(now, patterns, is_holiday),
        weather_conditions,
    }
}
