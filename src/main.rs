use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use visit_planner::{
    api::Dataset, config::PlannerConfig, coverage::compute_coverage, health::summarize_health, logging,
    profiles::segment,
};

/// Load the visit sheet and log the planning overview
#[derive(Parser, Debug)]
#[command(name = "visit_planner")]
struct Args {
    /// Establishments CSV
    #[arg(long)]
    establishments: Option<PathBuf>,

    /// Teams JSON
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Terminal telemetry JSON (mock data when omitted)
    #[arg(long)]
    telemetry: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init("info");

    let args = Args::parse();
    let mut config = PlannerConfig::from_env()?;
    if let Some(path) = args.establishments {
        config.establishments_path = path;
    }
    if let Some(path) = args.teams {
        config.teams_path = path;
    }
    if args.telemetry.is_some() {
        config.telemetry_path = args.telemetry;
    }

    let dataset = Dataset::load(&config)?;
    let records = dataset.reconciled();

    info!("=== Planning Overview ===");
    info!("Establishments: {}", records.len());
    info!("Teams: {} ({} active)", dataset.teams.len(), dataset.teams.iter().filter(|t| t.is_active).count());

    let health = summarize_health(&records);
    info!("Terminal health: {:?}", health);

    for profile in segment(&records) {
        info!(
            "Profile {:<20} {:>4} establishments | avg sales {:>10.2} | {:05.2}h-{:05.2}h",
            profile.label.name(),
            profile.members.len(),
            profile.avg_sales,
            profile.avg_open,
            profile.avg_close
        );
    }

    let coverage = compute_coverage(&records, &dataset.teams);
    info!(
        "Capacity: baseline {} | remaining {} | pending {} | health {}%",
        coverage.baseline_capacity, coverage.remaining_capacity, coverage.pending_visits, coverage.capacity_health
    );
    if !coverage.uncovered_regions.is_empty() {
        info!("Uncovered regions ({}): {:?}", coverage.uncovered_count, coverage.uncovered_regions);
    }

    Ok(())
}
