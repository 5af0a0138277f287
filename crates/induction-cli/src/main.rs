//! Operator CLI: drives induction-core's optimizer, decision engine, and
//! scheduler against an in-memory fixture fleet, so the behavior of a tick
//! can be inspected without wiring up real fleet-management adapters.

use clap::{Parser, Subcommand};
use induction_core::adapters::mock::{
    HeuristicMlPredictor, MockFeedbackSink, MockFleetReader, MockNotifier, MockStatusWriter,
};
use induction_core::health::RuleBasedAssessor;
use induction_core::{Configuration, InductionService, Trainset, TrainsetId, TrainsetStatus};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "induction-cli",
    about = "Operator CLI for the induction-core decision and scheduling engine",
    long_about = "Runs the Assignment Optimizer, Decision Engine, and Intelligent Scheduler\n\
                  against a fixture fleet, with no real fleet-management backend required."
)]
struct Cli {
    /// Number of fixture trainsets to generate
    #[arg(long, global = true, default_value_t = 20)]
    fleet_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision-engine evaluator tick followed by one executor tick
    Decide,
    /// Run one scheduling-loop tick and print the routing decision
    Schedule {
        /// Reported weather conditions for the tick
        #[arg(long, default_value = "sunny")]
        weather: String,
        /// Treat the tick as falling on a holiday
        #[arg(long, default_value_t = false)]
        holiday: bool,
    },
    /// Run a decision tick and a scheduling tick back to back
    Run {
        #[arg(long, default_value = "sunny")]
        weather: String,
        #[arg(long, default_value_t = false)]
        holiday: bool,
    },
}

/// Builds `count` trainsets with varied status/health/mileage so feasibility
/// and scoring both have something to differentiate on.
fn fixture_fleet(count: usize) -> Vec<Trainset> {
    (0..count)
        .map(|i| Trainset {
            id: TrainsetId::new(),
            number: format!("TS{i:03}"),
            status: if i % 9 == 0 { TrainsetStatus::Maintenance } else { TrainsetStatus::Available },
            cumulative_mileage_km: 40_000.0 + (i as f64) * 1_500.0,
            current_mileage_km: 40_000.0 + (i as f64) * 1_500.0,
            fitness_valid: true,
            fitness_expiry: Some(chrono::Utc::now().date_naive() + chrono::Duration::days(30)),
            pending_work_orders: if i % 7 == 0 { 1 } else { 0 },
            has_high_priority_work: false,
            branding_priority: (i % 5) as u8,
            daily_revenue_potential: 800.0 + (i as f64) * 25.0,
            last_cleaning: None,
            next_maintenance_due: Some(
                chrono::Utc::now().date_naive() + chrono::Duration::days(((i % 10) as i64) - 1),
            ),
            stabling_preference: (i % 3) as i32,
            reliability_score: 0.7 + 0.3 * ((i % 4) as f64 / 4.0),
            energy_efficiency_score: 0.7 + 0.3 * ((i % 5) as f64 / 5.0),
        })
        .collect()
}

fn build_service(fleet: Vec<Trainset>) -> (Arc<InductionService>, Arc<MockStatusWriter>, Arc<MockNotifier>) {
    let status_writer = Arc::new(MockStatusWriter::default());
    let notifier = Arc::new(MockNotifier::default());
    let service = InductionService::new(
        Configuration::default(),
        Arc::new(MockFleetReader::new(fleet)),
        status_writer.clone(),
        notifier.clone(),
        Arc::new(MockFeedbackSink::default()),
        Arc::new(HeuristicMlPredictor),
        Arc::new(RuleBasedAssessor),
    );
    (service, status_writer, notifier)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let fleet = fixture_fleet(cli.fleet_size);
    println!("fixture fleet: {} trainsets", fleet.len());

    match cli.command {
        Commands::Decide => {
            let (service, status_writer, notifier) = build_service(fleet);
            service.decision_evaluator_tick().await?;
            service.decision_executor_tick().await;
            println!("status writes issued: {}", status_writer.write_count());
            println!("notifications sent: {}", notifier.sent().len());
        }
        Commands::Schedule { weather, holiday } => {
            let weather: &'static str = Box::leak(weather.into_boxed_str());
            let (service, status_writer, _notifier) = build_service(fleet);
            service.scheduling_tick(weather, holiday).await?;
            println!("status writes issued: {}", status_writer.write_count());
        }
        Commands::Run { weather, holiday } => {
            let weather: &'static str = Box::leak(weather.into_boxed_str());
            let (service, status_writer, notifier) = build_service(fleet);
            service.decision_evaluator_tick().await?;
            service.decision_executor_tick().await;
            service.scheduling_tick(weather, holiday).await?;
            println!("status writes issued: {}", status_writer.write_count());
            println!("notifications sent: {}", notifier.sent().len());
        }
    }

    Ok(())
}
