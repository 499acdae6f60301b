//! Route planning through the routing assistant
//!
//! Distributes pending establishments to teams and asks for a day-by-day
//! itinerary, printing both as JSON.
//!
//! Usage:
//!   PLANNER_AI_URL=... ./target/release/plan_routes [OPTIONS]
//!
//! Options:
//!   --days <N>          Itinerary length (default: 5)
//!   --start <DATE>      First day, YYYY-MM-DD (default: today)
//!   --skip-distribution Plan only the establishments already assigned

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use visit_planner::{
    ai::{request_distribution, request_route_plan, HttpAiService},
    api::Dataset,
    config::PlannerConfig,
    logging,
};

#[derive(Parser, Debug)]
#[command(name = "plan_routes")]
#[command(about = "Distribute visits and build an itinerary with the routing assistant")]
struct Args {
    /// Itinerary length in days
    #[arg(long, default_value = "5")]
    days: u32,

    /// First day of the itinerary (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Do not ask for a distribution first
    #[arg(long)]
    skip_distribution: bool,

    #[arg(long)]
    establishments: Option<PathBuf>,

    #[arg(long)]
    teams: Option<PathBuf>,

    #[arg(long)]
    telemetry: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
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

    let Some(assistant) = HttpAiService::from_config(&config)? else {
        bail!("PLANNER_AI_URL is not set; the routing assistant is required");
    };

    let dataset = Dataset::load(&config)?;
    let mut records = dataset.reconciled();

    if !args.skip_distribution {
        records = request_distribution(&assistant, &records, &dataset.teams).await?;
        let assigned: Vec<_> = records.iter().filter(|r| r.is_assigned()).collect();
        info!("{} of {} establishments assigned", assigned.len(), records.len());
        println!("{}", serde_json::to_string_pretty(&assigned)?);
    }

    let start = args.start.unwrap_or_else(|| Local::now().date_naive());
    let assigned: Vec<_> = records.into_iter().filter(|r| r.is_assigned()).collect();
    if assigned.is_empty() {
        bail!("no assigned establishments to plan");
    }

    let plan = request_route_plan(&assistant, &assigned, &dataset.teams, start, args.days).await?;
    info!("Itinerary covers {} day(s)", plan.len());
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
