//! The `Trainset` data model (§3) and the eligibility filter feasibility
//! depends on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque trainset identity, paired with a human-readable number for display
/// and operator-facing decision rationale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrainsetId(pub uuid::Uuid);

impl TrainsetId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TrainsetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainsetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational status of a trainset. `Decommissioned` is terminal: the core
/// never re-enters it from any other state (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainsetStatus {
    Available,
    InService,
    Maintenance,
    OutOfOrder,
    Cleaning,
    Decommissioned,
}

impl TrainsetStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrainsetStatus::Decommissioned)
    }
}

/// Per-trainset snapshot of readiness state (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainset {
    pub id: TrainsetId,
    pub number: String,
    pub status: TrainsetStatus,
    pub cumulative_mileage_km: f64,
    pub current_mileage_km: f64,
    pub fitness_valid: bool,
    pub fitness_expiry: Option<NaiveDate>,
    pub pending_work_orders: u32,
    pub has_high_priority_work: bool,
    pub branding_priority: u8,
    pub daily_revenue_potential: f64,
    pub last_cleaning: Option<DateTime<Utc>>,
    /// Date the next scheduled maintenance falls due, if any (§4.4's
    /// maintenance-scheduling rule fires off this field directly; no
    /// maintenance-due date at all is a documented missing-data case, §7).
    pub next_maintenance_due: Option<NaiveDate>,
    pub stabling_preference: i32,
    pub reliability_score: f64,
    pub energy_efficiency_score: f64,
}

impl Trainset {
    /// A trainset marked out-of-order is never returned by the eligible filter (§3 invariant),
    /// independent of any other field.
    pub fn is_out_of_order(&self) -> bool {
        self.status == TrainsetStatus::OutOfOrder
    }

    /// Fitness-valid implies, if an expiry date is present, that it is strictly
    /// in the future relative to `today` (§3 invariant). A trainset whose
    /// expiry has passed is never fitness-valid regardless of the stored flag.
    pub fn fitness_currently_valid(&self, today: NaiveDate) -> bool {
        if !self.fitness_valid {
            return false;
        }
        match self.fitness_expiry {
            Some(expiry) => expiry > today,
            None => true,
        }
    }

    pub fn branding_revenue_note_applies(&self) -> bool {
        self.branding_priority > 3
    }
}

/// `available` trainsets whose fitness is valid today, with no high-priority
/// work open, and not out-of-order. This is the base eligibility filter;
/// the Assignment Optimizer's feasibility predicate (§4.1) adds a health
/// exclusion on top when invoked from the Scheduler.
pub fn available_and_fit<'a>(
    fleet: &'a [Trainset],
    today: NaiveDate,
) -> impl Iterator<Item = &'a Trainset> {
    fleet.iter().filter(move |t| {
        !t.is_out_of_order()
            && t.status == TrainsetStatus::Available
            && t.fitness_currently_valid(today)
            && !t.has_high_priority_work
    })
}

/// Fleet mean mileage over `current_mileage_km`. §9 Open Question (b): the
/// caller must treat a `0.0` mean specially rather than dividing by it.
pub fn fleet_mean_mileage(fleet: &[Trainset]) -> f64 {
    crate::stats::mean(
        &fleet
            .iter()
            .map(|t| t.current_mileage_km)
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub fn trainset(number: &str, status: TrainsetStatus) -> Trainset {
        Trainset {
            id: TrainsetId::new(),
            number: number.to_string(),
            status,
            cumulative_mileage_km: 50_000.0,
            current_mileage_km: 50_000.0,
            fitness_valid: true,
            fitness_expiry: None,
            pending_work_orders: 0,
            has_high_priority_work: false,
            branding_priority: 1,
            daily_revenue_potential: 1_000.0,
            last_cleaning: None,
            next_maintenance_due: None,
            stabling_preference: 0,
            reliability_score: 0.9,
            energy_efficiency_score: 0.9,
        }
    }
}
