//! Payment terminal health: telemetry join, mock generation and classification.
//!
//! With a telemetry table, each establishment is matched by name (exact, then
//! containment in table order). Without one, every establishment gets 1-3
//! mock terminals derived from its name, identical on every run.

use crate::models::{DeviceHealthRecord, EstablishmentRecord, PaperStatus};
use crate::text::telemetry_key;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Error rate (0-10 scale) at or above which a terminal is critical
pub const CRITICAL_ERROR_RATE: f64 = 6.0;
/// Signal below this is compromised
pub const WEAK_SIGNAL: f64 = 20.0;
/// Signal above this (with a low error rate) is operative
pub const GOOD_SIGNAL: f64 = 40.0;

const MOCK_MODELS: [&str; 4] = ["S920", "A920", "D195", "P2 Smart"];

// ============================================================================
// Telemetry table
// ============================================================================

/// Telemetry keyed by lower-cased establishment name, in insertion order.
///
/// Fuzzy matching walks the entries in order and the first hit wins, so the
/// order of the source document is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryTable {
    entries: Vec<(String, Vec<DeviceHealthRecord>)>,
    index: HashMap<String, usize>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds devices under a name. Repeated names append to the same entry.
    pub fn insert(&mut self, name: &str, devices: Vec<DeviceHealthRecord>) {
        let key = telemetry_key(name);
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1.extend(devices),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, devices));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DeviceHealthRecord])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Exact match on the telemetry key, then the first entry where either
    /// name contains the other.
    pub fn find(&self, name: &str) -> Option<&[DeviceHealthRecord]> {
        let key = telemetry_key(name);
        if key.is_empty() {
            return None;
        }
        if let Some(&i) = self.index.get(&key) {
            return Some(&self.entries[i].1);
        }
        self.entries
            .iter()
            .find(|(entry, _)| !entry.is_empty() && (key.contains(entry.as_str()) || entry.contains(key.as_str())))
            .map(|(_, devices)| devices.as_slice())
    }
}

impl FromIterator<(String, Vec<DeviceHealthRecord>)> for TelemetryTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<DeviceHealthRecord>)>>(iter: I) -> Self {
        let mut table = TelemetryTable::new();
        for (name, devices) in iter {
            table.insert(&name, devices);
        }
        table
    }
}

impl Serialize for TelemetryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, devices) in &self.entries {
            map.serialize_entry(key, devices)?;
        }
        map.end()
    }
}

struct TelemetryVisitor;

impl<'de> Visitor<'de> for TelemetryVisitor {
    type Value = TelemetryTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of establishment name to terminal records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = TelemetryTable::new();
        while let Some((name, devices)) = access.next_entry::<String, Vec<DeviceHealthRecord>>()? {
            table.insert(&name, devices);
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for TelemetryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TelemetryVisitor)
    }
}

// ============================================================================
// Mock generation
// ============================================================================

/// 32-bit rolling hash over UTF-16 code units (`h * 31 + unit`, wrapping)
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Sine-based pseudo-random sequence in [0, 1)
#[derive(Debug, Clone)]
pub struct SineSequence {
    seed: f64,
}

impl SineSequence {
    pub fn new(seed: f64) -> Self {
        Self { seed }
    }

    pub fn for_name(name: &str) -> Self {
        let h = (name_hash(name) as i64).abs();
        Self::new(if h == 0 { 1.0 } else { h as f64 })
    }

    pub fn next_f64(&mut self) -> f64 {
        let x = self.seed.sin() * 10000.0;
        self.seed += 1.0;
        x - x.floor()
    }

    /// Integer in [0, n)
    pub fn next_below(&mut self, n: u32) -> u32 {
        ((self.next_f64() * n as f64).floor() as u32).min(n.saturating_sub(1))
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic 1-3 mock terminals for an establishment name
pub fn generate_mock_health_data(name: &str) -> Vec<DeviceHealthRecord> {
    let mut rng = SineSequence::for_name(name);
    let tag = name_hash(name) as u32;
    let count = 1 + rng.next_below(3);

    (1..=count)
        .map(|i| {
            let model = MOCK_MODELS[rng.next_below(4) as usize];
            let signal_strength = rng.next_below(101) as f64;
            let battery_level = rng.next_below(101) as f64;
            let error_rate = round1(rng.next_f64() * 10.0);
            let paper = rng.next_f64();
            let paper_status = if paper < 0.7 {
                PaperStatus::Ok
            } else if paper < 0.9 {
                PaperStatus::Low
            } else {
                PaperStatus::Empty
            };
            let firmware_version = format!(
                "v{}.{}.{}",
                1 + rng.next_below(3),
                rng.next_below(10),
                rng.next_below(10)
            );
            let incidents = rng.next_below(5);
            let avg_uptime = round1(rng.next_f64() * 24.0);

            DeviceHealthRecord {
                machine_id: format!("POS-{:08X}-{}", tag, i),
                model: model.to_string(),
                signal_strength,
                battery_level,
                error_rate,
                paper_status,
                firmware_version,
                incidents,
                avg_uptime,
                last_update: "mock".to_string(),
            }
        })
        .collect()
}

// ============================================================================
// Join
// ============================================================================

/// Attach terminal health to every record, returning a new list.
///
/// A missing or empty table switches to mock generation. Records that match
/// nothing in a real table keep `health_data = None`.
pub fn join_health_data(records: &[EstablishmentRecord], telemetry: Option<&TelemetryTable>) -> Vec<EstablishmentRecord> {
    let table = telemetry.filter(|t| !t.is_empty());

    let Some(table) = table else {
        info!(records = records.len(), "no telemetry source, generating mock terminal data");
        return records
            .iter()
            .map(|r| EstablishmentRecord {
                health_data: Some(generate_mock_health_data(&r.name)),
                ..r.clone()
            })
            .collect();
    };

    let mut matched = 0usize;
    let joined: Vec<EstablishmentRecord> = records
        .iter()
        .map(|r| {
            let devices = table.find(&r.name).map(|d| d.to_vec());
            if devices.is_some() {
                matched += 1;
            } else {
                debug!(id = %r.id, name = %r.name, "no telemetry match");
            }
            EstablishmentRecord {
                health_data: devices,
                ..r.clone()
            }
        })
        .collect();

    info!(
        records = records.len(),
        matched,
        unmatched = records.len() - matched,
        "telemetry join complete"
    );
    joined
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Operative,
    Attention,
    Compromised,
    Critical,
}

impl HealthStatus {
    /// 0 = healthy, 3 = worst
    pub fn severity(&self) -> u8 {
        *self as u8
    }
}

/// Critical, then compromised, then operative; anything else needs attention.
pub fn classify_device(device: &DeviceHealthRecord) -> HealthStatus {
    if device.error_rate >= CRITICAL_ERROR_RATE {
        return HealthStatus::Critical;
    }
    if device.paper_status != PaperStatus::Ok || device.signal_strength < WEAK_SIGNAL {
        return HealthStatus::Compromised;
    }
    if device.error_rate < CRITICAL_ERROR_RATE && device.signal_strength > GOOD_SIGNAL {
        return HealthStatus::Operative;
    }
    HealthStatus::Attention
}

/// Worst status across an establishment's terminals; `None` when unknown or empty
pub fn establishment_status(record: &EstablishmentRecord) -> Option<HealthStatus> {
    record
        .health_data
        .as_ref()?
        .iter()
        .map(classify_device)
        .max()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub operative: usize,
    pub attention: usize,
    pub compromised: usize,
    pub critical: usize,
    /// No telemetry, or telemetry with zero terminals
    pub unknown: usize,
}

pub fn summarize_health(records: &[EstablishmentRecord]) -> HealthSummary {
    let mut summary = HealthSummary::default();
    for record in records {
        match establishment_status(record) {
            Some(HealthStatus::Operative) => summary.operative += 1,
            Some(HealthStatus::Attention) => summary.attention += 1,
            Some(HealthStatus::Compromised) => summary.compromised += 1,
            Some(HealthStatus::Critical) => summary.critical += 1,
            None => summary.unknown += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(signal: f64, error_rate: f64, paper: PaperStatus) -> DeviceHealthRecord {
        DeviceHealthRecord {
            machine_id: "m1".into(),
            model: "S920".into(),
            signal_strength: signal,
            battery_level: 80.0,
            error_rate,
            paper_status: paper,
            firmware_version: "v1.0.0".into(),
            incidents: 0,
            avg_uptime: 12.0,
            last_update: "2024-05-01".into(),
        }
    }

    #[test]
    fn test_classification_order() {
        // critical wins over compromised conditions
        assert_eq!(classify_device(&device(10.0, 7.0, PaperStatus::Empty)), HealthStatus::Critical);
        assert_eq!(classify_device(&device(90.0, 6.0, PaperStatus::Ok)), HealthStatus::Critical);
        assert_eq!(classify_device(&device(90.0, 1.0, PaperStatus::Low)), HealthStatus::Compromised);
        assert_eq!(classify_device(&device(19.0, 1.0, PaperStatus::Ok)), HealthStatus::Compromised);
        assert_eq!(classify_device(&device(41.0, 5.9, PaperStatus::Ok)), HealthStatus::Operative);
        assert_eq!(classify_device(&device(40.0, 1.0, PaperStatus::Ok)), HealthStatus::Attention);
        assert_eq!(classify_device(&device(20.0, 0.0, PaperStatus::Ok)), HealthStatus::Attention);
    }

    #[test]
    fn test_mock_is_reproducible() {
        let a = generate_mock_health_data("Padaria do João");
        let b = generate_mock_health_data("Padaria do João");
        assert_eq!(a, b);
        assert!((1..=3).contains(&a.len()));
        for d in &a {
            assert!(d.machine_id.starts_with("POS-"));
            assert!((0.0..=100.0).contains(&d.signal_strength));
            assert!((0.0..=100.0).contains(&d.battery_level));
            assert!((0.0..=10.0).contains(&d.error_rate));
            assert!(MOCK_MODELS.contains(&d.model.as_str()));
            assert_eq!(d.last_update, "mock");
        }
    }

    #[test]
    fn test_mock_values_for_known_name() {
        let mock = |i: u32, model: &str, signal: f64, battery: f64, error_rate: f64, firmware: &str, uptime: f64| {
            DeviceHealthRecord {
                machine_id: format!("POS-D262DA62-{}", i),
                model: model.into(),
                signal_strength: signal,
                battery_level: battery,
                error_rate,
                paper_status: PaperStatus::Ok,
                firmware_version: firmware.into(),
                incidents: 1,
                avg_uptime: uptime,
                last_update: "mock".into(),
            }
        };
        assert_eq!(
            generate_mock_health_data("Padaria do João"),
            vec![
                mock(1, "D195", 35.0, 85.0, 0.9, "v2.5.5", 3.2),
                mock(2, "P2 Smart", 21.0, 36.0, 7.4, "v2.8.9", 14.8),
            ]
        );
    }

    #[test]
    fn test_sine_sequence_values() {
        let mut rng = SineSequence::new(1.0);
        let x = 1.0f64.sin() * 10000.0;
        assert_eq!(rng.next_f64(), x - x.floor());
        let y = 2.0f64.sin() * 10000.0;
        assert_eq!(rng.next_f64(), y - y.floor());
    }

    #[test]
    fn test_name_hash() {
        assert_eq!(name_hash(""), 0);
        assert_eq!(name_hash("a"), 97);
        assert_eq!(name_hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_exact_then_fuzzy_match() {
        let mut table = TelemetryTable::new();
        table.insert("Mercado Central", vec![device(80.0, 1.0, PaperStatus::Ok)]);
        table.insert("padaria", vec![device(10.0, 1.0, PaperStatus::Ok)]);
        table.insert("padaria silva", vec![device(50.0, 9.0, PaperStatus::Ok)]);

        // exact beats an earlier containment hit
        assert_eq!(table.find(" Padaria Silva ").unwrap()[0].error_rate, 9.0);
        // first entry in order wins for containment
        assert_eq!(table.find("Padaria Silva e Filhos").unwrap()[0].signal_strength, 10.0);
        assert_eq!(table.find("central").unwrap()[0].signal_strength, 80.0);
        assert!(table.find("Farmácia").is_none());
        assert!(table.find("  ").is_none());
    }

    #[test]
    fn test_join_distinguishes_unknown() {
        let table: TelemetryTable = vec![("bar do zé".to_string(), Vec::new())].into_iter().collect();
        let records = vec![
            EstablishmentRecord::new("1", "Bar do Zé"),
            EstablishmentRecord::new("2", "Oficina"),
        ];
        let joined = join_health_data(&records, Some(&table));
        assert_eq!(joined[0].health_data, Some(Vec::new()));
        assert_eq!(joined[1].health_data, None);
        // input untouched
        assert!(records[0].health_data.is_none());
    }

    #[test]
    fn test_join_without_table_uses_mock() {
        let records = vec![EstablishmentRecord::new("1", "Padaria do João")];
        let joined = join_health_data(&records, None);
        assert_eq!(joined[0].health_data, Some(generate_mock_health_data("Padaria do João")));

        let empty = TelemetryTable::new();
        let joined_empty = join_health_data(&records, Some(&empty));
        assert_eq!(joined, joined_empty);
    }

    #[test]
    fn test_table_keeps_document_order() {
        let json = r#"{"zeta": [], "alpha": [], "mid": []}"#;
        let table: TelemetryTable = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_summary() {
        let mut ok = EstablishmentRecord::new("1", "A");
        ok.health_data = Some(vec![device(90.0, 1.0, PaperStatus::Ok), device(30.0, 1.0, PaperStatus::Ok)]);
        let mut bad = EstablishmentRecord::new("2", "B");
        bad.health_data = Some(vec![device(90.0, 8.0, PaperStatus::Ok)]);
        let unknown = EstablishmentRecord::new("3", "C");

        assert_eq!(establishment_status(&ok), Some(HealthStatus::Attention));
        let summary = summarize_health(&[ok, bad, unknown]);
        assert_eq!(
            summary,
            HealthSummary { operative: 0, attention: 1, compromised: 0, critical: 1, unknown: 1 }
        );
    }
}
