//! Sample data generator for the visit planner
//!
//! Writes an establishments CSV (Portuguese headers) and a matching teams JSON
//! with controlled random variation, so the planner can be tried end to end.
//!
//! Usage:
//!   cargo run --release --bin generate_sample -- [OPTIONS]
//!
//! Options:
//!   --count <N>          Number of establishments (default: 60)
//!   --teams <N>          Number of teams (default: 3)
//!   --seed <N>           Random seed for reproducibility (optional)
//!   --output <PATH>      Output CSV path (default: data/establishments.csv)
//!   --teams-output <PATH> Output teams JSON path (default: data/teams.json)

use anyhow::Result;
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use visit_planner::models::{ServiceRegion, Team, TeamMember};

/// Sample data generator for establishments and teams
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Generate sample establishments and teams")]
struct Args {
    /// Number of establishments
    #[arg(long, default_value = "60")]
    count: usize,

    /// Number of teams
    #[arg(long, default_value = "3")]
    teams: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long, default_value = "data/establishments.csv")]
    output: PathBuf,

    /// Output teams JSON path
    #[arg(long, default_value = "data/teams.json")]
    teams_output: PathBuf,
}

/// One CSV row, serialized with the sheet's Portuguese headers
#[derive(Debug, Serialize)]
struct SampleRow {
    #[serde(rename = "Código")]
    id: String,
    #[serde(rename = "Nome")]
    name: String,
    #[serde(rename = "Faturamento")]
    sales: String,
    #[serde(rename = "Segmento")]
    sector: String,
    #[serde(rename = "Abertura")]
    open_time: String,
    #[serde(rename = "Fechamento")]
    close_time: String,
    #[serde(rename = "Endereço")]
    address: String,
    #[serde(rename = "Bairro")]
    neighborhood: String,
    #[serde(rename = "Município")]
    municipality: String,
}

const PREFIXES: &[&str] = &[
    "Padaria", "Mercado", "Farmácia", "Restaurante", "Bar", "Açougue", "Papelaria", "Pet Shop", "Lanchonete",
    "Empório",
];
const SURNAMES: &[&str] = &[
    "do João", "Silva", "Central", "São Jorge", "Boa Vista", "da Praça", "Primavera", "Estrela", "Santa Luzia",
    "Bom Preço",
];
const STREETS: &[&str] = &[
    "Rua Augusta",
    "Av. Paulista",
    "Rua Teodoro Sampaio",
    "Rua da Consolação",
    "Av. Brasil",
    "Rua das Flores",
];

/// (municipality, neighborhoods)
const CITIES: &[(&str, &[&str])] = &[
    ("São Paulo", &["Pinheiros", "Moema", "Centro", "Vila Mariana", "Tatuapé"]),
    ("Campinas", &["Cambuí", "Centro", "Taquaral"]),
    ("Santo André", &["Centro", "Vila Assunção"]),
];

/// Opening windows; the last ones run overnight or extended
const HOURS: &[(&str, &str)] = &[
    ("06:00", "14:00"),
    ("07:00", "19:00"),
    ("08:00", "18:00"),
    ("09:00", "18:00"),
    ("10:00", "22:00"),
    ("11:00", "23:00"),
    ("18:00", "02:00"),
];

const SECTORS: &[&str] = &["Alimentação", "Saúde", "Varejo", "Serviços"];

const MEMBER_NAMES: &[&str] = &["Ana", "Bruno", "Carla", "Diego", "Elisa", "Fábio", "Gabi", "Hugo", "Iara"];

/// Format as Brazilian currency, e.g. `R$ 12.345,67`
fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("R$ {},{:02}", grouped, cents % 100)
}

fn sample_row(index: usize, rng: &mut impl Rng) -> SampleRow {
    let (city, neighborhoods) = CITIES[rng.gen_range(0..CITIES.len())];
    let (open, close) = HOURS[rng.gen_range(0..HOURS.len())];
    // Log-uniform-ish spread so the sales profiles separate
    let sales = 10f64.powf(rng.gen_range(3.0..5.5));

    SampleRow {
        id: format!("EST-{:04}", index + 1),
        name: format!(
            "{} {}",
            PREFIXES[rng.gen_range(0..PREFIXES.len())],
            SURNAMES[rng.gen_range(0..SURNAMES.len())]
        ),
        sales: format_brl(sales),
        sector: SECTORS[rng.gen_range(0..SECTORS.len())].to_string(),
        open_time: open.to_string(),
        close_time: close.to_string(),
        address: format!("{}, {}", STREETS[rng.gen_range(0..STREETS.len())], rng.gen_range(1..2000)),
        neighborhood: neighborhoods[rng.gen_range(0..neighborhoods.len())].to_string(),
        municipality: city.to_string(),
    }
}

fn sample_teams(count: usize, rows: &[SampleRow], rng: &mut impl Rng) -> Vec<Team> {
    (0..count)
        .map(|t| {
            let (city, neighborhoods) = CITIES[t % CITIES.len()];
            let regions = if t < CITIES.len() {
                vec![ServiceRegion {
                    city: city.to_string(),
                    neighborhood: None,
                }]
            } else {
                vec![ServiceRegion {
                    city: city.to_string(),
                    neighborhood: Some(neighborhoods[rng.gen_range(0..neighborhoods.len())].to_string()),
                }]
            };

            let members = (0..rng.gen_range(1..=3))
                .map(|m| {
                    let name = MEMBER_NAMES[(t * 3 + m) % MEMBER_NAMES.len()];
                    // Occasionally give a member one fixed establishment from their city
                    let portfolio = rows
                        .iter()
                        .filter(|r| r.municipality == city)
                        .choose(&mut *rng)
                        .filter(|_| rng.gen_bool(0.5))
                        .map(|r| vec![r.name.clone()])
                        .unwrap_or_default();
                    TeamMember {
                        id: format!("M{}{}", t + 1, m + 1),
                        name: name.to_string(),
                        is_on_vacation: rng.gen_bool(0.1),
                        portfolio,
                        schedule: None,
                    }
                })
                .collect();

            Team {
                id: format!("T{}", t + 1),
                name: format!("Equipe {}", city),
                is_active: rng.gen_bool(0.9),
                max_activities_per_route: rng.gen_range(4..=10),
                regions,
                members,
            }
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Sample Data Generator");
    println!("=====================");
    println!("Establishments: {}", args.count);
    println!("Teams:          {}", args.teams);
    println!("Seed:           {:?}", args.seed);
    println!("Output:         {:?}", args.output);
    println!();

    let mut rng: StdRng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let rows: Vec<SampleRow> = (0..args.count).map(|i| sample_row(i, &mut rng)).collect();
    let teams = sample_teams(args.teams, &rows, &mut rng);

    for path in [&args.output, &args.teams_output] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = WriterBuilder::new().from_path(&args.output)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    serde_json::to_writer_pretty(File::create(&args.teams_output)?, &teams)?;

    println!("Wrote {} establishments to {:?}", rows.len(), args.output);
    println!("Wrote {} teams to {:?}", teams.len(), args.teams_output);
    Ok(())
}
