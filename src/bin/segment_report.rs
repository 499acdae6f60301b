//! Establishment Segmentation Report
//! Groups establishments into operational profiles for visit planning
//!
//! Run: ./target/release/segment_report [section]
//! Sections: all, profiles, members, health, coverage

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use visit_planner::{
    api::Dataset,
    config::PlannerConfig,
    coverage::{compute_coverage, CoverageReport},
    health::{establishment_status, summarize_health, HealthStatus},
    logging,
    models::{EstablishmentRecord, Team},
    profiles::{segment, ClusterProfile, ProfileLabel},
    text::truncate_display,
};

#[derive(Parser, Debug)]
#[command(name = "segment_report")]
#[command(about = "Console report of establishment profiles, terminal health and coverage")]
struct Args {
    /// Section to print: all, profiles, members, health, coverage
    #[arg(default_value = "all")]
    section: String,

    #[arg(long)]
    establishments: Option<PathBuf>,

    #[arg(long)]
    teams: Option<PathBuf>,

    #[arg(long)]
    telemetry: Option<PathBuf>,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(90));
    println!("  {}", title);
    println!("{}\n", "═".repeat(90));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(80));
}

fn indicator(label: ProfileLabel) -> &'static str {
    match label {
        ProfileLabel::HighPerformance | ProfileLabel::PremiumMorning => "🟢",
        ProfileLabel::ExtendedOperation | ProfileLabel::StandardCommerce => "🔵",
        ProfileLabel::LowPerformance => "🔴",
        _ => "⚪",
    }
}

fn format_hour(hours: f64) -> String {
    let total_minutes = (hours * 60.0).round() as i64;
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

fn main() -> Result<()> {
    logging::init("warn");
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
    let profiles = segment(&records);

    println!("\n{}", "█".repeat(90));
    println!("{}  ESTABLISHMENT SEGMENTATION  {}", "█".repeat(29), "█".repeat(30));
    println!("{}\n", "█".repeat(90));

    match args.section.as_str() {
        "all" => {
            run_profile_summary(&profiles, records.len());
            run_profile_members(&profiles, &records);
            run_health(&records);
            run_coverage(&compute_coverage(&records, &dataset.teams), &dataset.teams);
        }
        "profiles" => run_profile_summary(&profiles, records.len()),
        "members" => run_profile_members(&profiles, &records),
        "health" => run_health(&records),
        "coverage" => run_coverage(&compute_coverage(&records, &dataset.teams), &dataset.teams),
        other => {
            println!("Unknown section: {}", other);
            println!("Available: all, profiles, members, health, coverage");
        }
    }

    println!("\n{}", "█".repeat(90));
    Ok(())
}

fn run_profile_summary(profiles: &[ClusterProfile], total: usize) {
    print_section_header("PROFILE SUMMARY");

    if profiles.is_empty() {
        println!("  Not enough establishments to segment ({} loaded, 4 needed)", total);
        return;
    }

    for profile in profiles {
        println!(
            "{} {} ({} establishments)",
            indicator(profile.label),
            profile.label,
            profile.members.len()
        );
        println!("   {}", profile.description);
        println!(
            "   Avg Sales: {:.2} | Hours: {}-{} | Duration: {:.1}h",
            profile.avg_sales,
            format_hour(profile.avg_open),
            format_hour(profile.avg_close),
            profile.avg_duration
        );
        println!();
    }

    print_subsection("Profile Distribution");
    println!("  {:25} {:>15} {:>12}", "Profile", "Establishments", "% Total");
    println!("  {}", "─".repeat(54));
    for profile in profiles {
        let pct = profile.members.len() as f64 / total as f64 * 100.0;
        println!("  {:25} {:>15} {:>11.1}%", profile.label.name(), profile.members.len(), pct);
    }
}

fn run_profile_members(profiles: &[ClusterProfile], records: &[EstablishmentRecord]) {
    print_section_header("ESTABLISHMENTS BY PROFILE");

    let by_id: HashMap<&str, &EstablishmentRecord> = records.iter().map(|r| (r.id.as_str(), r)).collect();

    for profile in profiles {
        let mut members: Vec<&EstablishmentRecord> = profile
            .members
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect();
        members.sort_by(|a, b| {
            b.average_sales
                .unwrap_or(0.0)
                .total_cmp(&a.average_sales.unwrap_or(0.0))
        });

        print_subsection(&format!("{} ({} establishments)", profile.label, members.len()));
        println!("  {:32} {:>12} {:>7} {:>7} {:20}", "Name", "Sales", "Open", "Close", "Neighborhood");
        println!("  {}", "─".repeat(82));

        for record in members.iter().take(15) {
            println!(
                "  {:32} {:>12.2} {:>7} {:>7} {:20}",
                truncate_display(&record.name, 29),
                record.average_sales.unwrap_or(0.0),
                record.open_time.as_deref().unwrap_or("-"),
                record.close_time.as_deref().unwrap_or("-"),
                truncate_display(&record.neighborhood, 17)
            );
        }
        if members.len() > 15 {
            println!("  ... and {} more establishments", members.len() - 15);
        }
    }
}

fn run_health(records: &[EstablishmentRecord]) {
    print_section_header("TERMINAL HEALTH");

    let summary = summarize_health(records);
    println!("  🟢 Operative:   {}", summary.operative);
    println!("  🟡 Attention:   {}", summary.attention);
    println!("  🟠 Compromised: {}", summary.compromised);
    println!("  🔴 Critical:    {}", summary.critical);
    println!("  ⚪ Unknown:     {}", summary.unknown);

    let critical: Vec<&EstablishmentRecord> = records
        .iter()
        .filter(|r| establishment_status(r) == Some(HealthStatus::Critical))
        .collect();
    if !critical.is_empty() {
        print_subsection("Critical Establishments (visit first)");
        for record in critical.iter().take(20) {
            let devices = record.health_data.as_deref().unwrap_or_default();
            let worst = devices.iter().map(|d| d.error_rate).fold(0.0_f64, f64::max);
            println!(
                "  {:32} {} terminal(s), worst error rate {:.1}%",
                truncate_display(&record.name, 29),
                devices.len(),
                worst
            );
        }
    }
}

fn run_coverage(report: &CoverageReport, teams: &[Team]) {
    print_section_header("TEAM COVERAGE");

    println!("  Active teams:        {} of {}", report.active_teams, teams.len());
    println!("  Available members:   {}", report.available_members);
    println!("  Baseline capacity:   {}", report.baseline_capacity);
    println!("  Assigned visits:     {}", report.assigned_visits);
    println!("  Pending visits:      {}", report.pending_visits);
    println!("  Remaining capacity:  {}", report.remaining_capacity);
    println!("  Capacity health:     {}%", report.capacity_health);

    if !report.uncovered_regions.is_empty() {
        print_subsection(&format!(
            "Uncovered Regions ({} establishments without a team)",
            report.uncovered_count
        ));
        for label in &report.uncovered_regions {
            println!("  • {}", label);
        }
    }
}
