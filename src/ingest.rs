//! Loading establishments, teams and telemetry from files
//!
//! The establishment sheet is a CSV whose headers may be in English or
//! Portuguese. Recognized columns fill the typed fields; everything else is
//! kept in the record's extension map.

use crate::error::Result;
use crate::health::TelemetryTable;
use crate::models::{EstablishmentRecord, Team};
use crate::text::normalize_name;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Sales,
    Sector,
    OpenTime,
    CloseTime,
    Address,
    Neighborhood,
    Municipality,
}

/// Normalized header alias -> column
static HEADER_ALIASES: LazyLock<HashMap<&'static str, Column>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert("id", Column::Id);
    m.insert("codigo", Column::Id);
    m.insert("cod", Column::Id);

    m.insert("name", Column::Name);
    m.insert("nome", Column::Name);
    m.insert("estabelecimento", Column::Name);
    m.insert("cliente", Column::Name);
    m.insert("razao social", Column::Name);

    m.insert("average sales", Column::Sales);
    m.insert("averagesales", Column::Sales);
    m.insert("sales", Column::Sales);
    m.insert("faturamento", Column::Sales);
    m.insert("vendas", Column::Sales);
    m.insert("media de vendas", Column::Sales);

    m.insert("sector", Column::Sector);
    m.insert("segmento", Column::Sector);
    m.insert("ramo", Column::Sector);

    m.insert("open time", Column::OpenTime);
    m.insert("opentime", Column::OpenTime);
    m.insert("abertura", Column::OpenTime);
    m.insert("horario abertura", Column::OpenTime);

    m.insert("close time", Column::CloseTime);
    m.insert("closetime", Column::CloseTime);
    m.insert("fechamento", Column::CloseTime);
    m.insert("horario fechamento", Column::CloseTime);

    m.insert("address", Column::Address);
    m.insert("endereco", Column::Address);
    m.insert("logradouro", Column::Address);

    m.insert("neighborhood", Column::Neighborhood);
    m.insert("bairro", Column::Neighborhood);

    m.insert("municipality", Column::Municipality);
    m.insert("city", Column::Municipality);
    m.insert("cidade", Column::Municipality);
    m.insert("municipio", Column::Municipality);

    m
});

fn column_for(header: &str) -> Option<Column> {
    HEADER_ALIASES.get(normalize_name(header).as_str()).copied()
}

/// Parse a sales figure such as `1500`, `R$ 1.234,56` or `1,234.56`.
/// Returns `None` for anything that does not look like a number.
pub fn parse_sales(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // comma is the decimal separator: 1.234,56
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        // dot is the decimal separator: 1,234.56
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Read establishment rows from any CSV source
pub fn read_establishments<R: Read>(source: R) -> Result<Vec<EstablishmentRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<Column>> = headers.iter().map(column_for).collect();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in reader.records().enumerate() {
        let row_data = result?;
        let mut record = EstablishmentRecord::default();

        for (i, value) in row_data.iter().enumerate() {
            match columns.get(i).copied().flatten() {
                Some(Column::Id) => record.id = value.trim().to_string(),
                Some(Column::Name) => record.name = value.trim().to_string(),
                Some(Column::Sales) => record.average_sales = parse_sales(value),
                Some(Column::Sector) => record.sector = non_empty(value),
                Some(Column::OpenTime) => record.open_time = non_empty(value),
                Some(Column::CloseTime) => record.close_time = non_empty(value),
                Some(Column::Address) => record.address = value.trim().to_string(),
                Some(Column::Neighborhood) => record.neighborhood = value.trim().to_string(),
                Some(Column::Municipality) => record.municipality = value.trim().to_string(),
                None => {
                    if let Some(header) = headers.get(i).filter(|h| !h.is_empty()) {
                        record
                            .extra
                            .insert(header.to_string(), serde_json::Value::String(value.to_string()));
                    }
                }
            }
        }

        if record.name.is_empty() {
            skipped += 1;
            continue;
        }
        if record.id.is_empty() {
            record.id = format!("row-{}", row + 1);
        }
        records.push(record);
    }

    if skipped > 0 {
        warn!(skipped, "skipped rows without an establishment name");
    }
    Ok(records)
}

pub fn load_establishments_csv(path: impl AsRef<Path>) -> Result<Vec<EstablishmentRecord>> {
    let path = path.as_ref();
    let records = read_establishments(File::open(path)?)?;
    info!("Loaded {} establishments from {:?}", records.len(), path);
    Ok(records)
}

pub fn load_teams_json(path: impl AsRef<Path>) -> Result<Vec<Team>> {
    let path = path.as_ref();
    let teams: Vec<Team> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    info!("Loaded {} teams from {:?}", teams.len(), path);
    Ok(teams)
}

pub fn load_telemetry_json(path: impl AsRef<Path>) -> Result<TelemetryTable> {
    let path = path.as_ref();
    let table: TelemetryTable = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    info!("Loaded telemetry for {} establishments from {:?}", table.len(), path);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_sales_formats() {
        assert_eq!(parse_sales("1500"), Some(1500.0));
        assert_eq!(parse_sales("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_sales("1,234.56"), Some(1234.56));
        assert_eq!(parse_sales("99,9"), Some(99.9));
        assert_eq!(parse_sales(""), None);
        assert_eq!(parse_sales("sem info"), None);
    }

    #[test]
    fn test_portuguese_headers() {
        let csv = "Código,Nome,Faturamento,Abertura,Fechamento,Endereço,Bairro,Cidade,CNPJ\n\
                   10,Padaria Silva,\"R$ 2.500,00\",06:00,20:00,Rua A 1,Pinheiros,São Paulo,123\n\
                   ,Bar do Zé,,,,,,,\n\
                   11,,100,,,,,,\n";
        let records = read_establishments(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id, "10");
        assert_eq!(first.name, "Padaria Silva");
        assert_eq!(first.average_sales, Some(2500.0));
        assert_eq!(first.open_time.as_deref(), Some("06:00"));
        assert_eq!(first.neighborhood, "Pinheiros");
        assert_eq!(first.municipality, "São Paulo");
        assert_eq!(first.extra.get("CNPJ"), Some(&serde_json::json!("123")));

        assert_eq!(records[1].id, "row-2");
        assert_eq!(records[1].average_sales, None);
        assert_eq!(records[1].open_time, None);
    }

    #[test]
    fn test_load_files() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("visits.csv");
        let mut f = File::create(&csv_path).unwrap();
        writeln!(f, "id,name,average_sales,open_time,close_time").unwrap();
        writeln!(f, "e1,Mercado,900,08:00,22:00").unwrap();
        let records = load_establishments_csv(&csv_path).unwrap();
        assert_eq!(records[0].average_sales, Some(900.0));

        let teams_path = dir.path().join("teams.json");
        std::fs::write(
            &teams_path,
            r#"[{"id":"t1","name":"Centro","maxActivitiesPerRoute":12,"regions":[{"city":"São Paulo"}]}]"#,
        )
        .unwrap();
        let teams = load_teams_json(&teams_path).unwrap();
        assert_eq!(teams[0].max_activities_per_route, 12);

        let telemetry_path = dir.path().join("telemetry.json");
        std::fs::write(&telemetry_path, r#"{"Mercado": []}"#).unwrap();
        let table = load_telemetry_json(&telemetry_path).unwrap();
        assert!(table.find("mercado").is_some());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_establishments_csv("/nonexistent/visits.csv").is_err());
    }
}
