//! REST API Server for the Visit Planner
//!
//! Usage:
//!   ./target/release/api_server [options]
//!
//! Options:
//!   --port PORT               Port to listen on (default: PLANNER_PORT or 8080)
//!   --establishments PATH     Establishments CSV
//!   --teams PATH              Teams JSON
//!   --telemetry PATH          Terminal telemetry JSON
//!
//! REST endpoints:
//!   GET  /api/v1/health             - Health check
//!   GET  /api/v1/establishments     - Enriched establishments
//!   PUT  /api/v1/establishments     - Replace establishments
//!   PUT  /api/v1/teams              - Replace teams
//!   PUT  /api/v1/telemetry          - Replace telemetry table
//!   GET  /api/v1/segments           - Operational profiles
//!   GET  /api/v1/coverage           - Team coverage and capacity
//!   GET  /api/v1/health-summary     - Terminal health counts
//!   POST /api/v1/distribute         - Assistant-driven distribution

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use visit_planner::{
    ai::HttpAiService,
    api::{create_router, Dataset, PlannerService},
    config::PlannerConfig,
    logging,
};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the visit planner over HTTP")]
struct Args {
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    establishments: Option<PathBuf>,

    #[arg(long)]
    teams: Option<PathBuf>,

    #[arg(long)]
    telemetry: Option<PathBuf>,
}

fn print_banner(port: u16, assistant: bool) {
    println!("============================================================");
    println!("              VISIT PLANNER API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:       {}", port);
    println!("  REST:       http://localhost:{}/api/v1/", port);
    println!("  Assistant:  {}", if assistant { "enabled" } else { "disabled" });
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health             Health check");
    println!("  GET  /api/v1/establishments     Enriched establishments");
    println!("  PUT  /api/v1/establishments     Replace establishments");
    println!("  PUT  /api/v1/teams              Replace teams");
    println!("  PUT  /api/v1/telemetry          Replace telemetry");
    println!("  GET  /api/v1/segments           Operational profiles");
    println!("  GET  /api/v1/coverage           Coverage and capacity");
    println!("  GET  /api/v1/health-summary     Terminal health counts");
    println!("  POST /api/v1/distribute         Distribute pending visits");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    let args = Args::parse();
    let mut config = PlannerConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
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
    let mut service = PlannerService::new(dataset);
    if let Some(ai) = HttpAiService::from_config(&config)? {
        service = service.with_ai(Arc::new(ai));
    }

    print_banner(config.port, service.ai_enabled());

    let app = create_router(Arc::new(service));
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
