#![allow(dead_code)]

use induction_core::{Trainset, TrainsetId, TrainsetStatus};

/// Builds `count` available trainsets with varied mileage/branding/reliability
/// so feasibility and scoring both have something to differentiate on.
pub fn fixture_fleet(count: usize) -> Vec<Trainset> {
    (0..count)
        .map(|i| Trainset {
            id: TrainsetId::new(),
            number: format!("TS{i:03}"),
            status: TrainsetStatus::Available,
            cumulative_mileage_km: 40_000.0 + (i as f64) * 1_500.0,
            current_mileage_km: 40_000.0 + (i as f64) * 1_500.0,
            fitness_valid: true,
            fitness_expiry: Some(chrono::Utc::now().date_naive() + chrono::Duration::days(30)),
            pending_work_orders: 0,
            has_high_priority_work: false,
            branding_priority: (i % 5) as u8,
            daily_revenue_potential: 800.0 + (i as f64) * 25.0,
            last_cleaning: None,
            next_maintenance_due: None,
            stabling_preference: (i % 3) as i32,
            reliability_score: 0.8,
            energy_efficiency_score: 0.8,
        })
        .collect()
}

pub fn trainset(number: &str, status: TrainsetStatus) -> Trainset {
    Trainset {
        id: TrainsetId::new(),
        number: number.to_string(),
        status,
        cumulative_mileage_km: 50_000.0,
        current_mileage_km: 50_000.0,
        fitness_valid: true,
        fitness_expiry: Some(chrono::Utc::now().date_naive() + chrono::Duration::days(30)),
        pending_work_orders: 0,
        has_high_priority_work: false,
        branding_priority: 1,
        daily_revenue_potential: 1_000.0,
        last_cleaning: None,
        next_maintenance_due: None,
        stabling_preference: 0,
        reliability_score: 0.8,
        energy_efficiency_score: 0.8,
    }
}
