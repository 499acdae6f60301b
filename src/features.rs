//! Feature extraction for establishment segmentation.
//!
//! Every record yields a vector, whatever the quality of its data: missing or
//! unparsable values fall back to fixed defaults and nothing is reported.

use crate::models::EstablishmentRecord;
use chrono::{NaiveTime, Timelike};

pub const DEFAULT_OPEN_HOUR: f64 = 9.0;
pub const DEFAULT_CLOSE_HOUR: f64 = 18.0;

/// Time features are divided by this fixed span
pub const HOURS_PER_DAY: f64 = 24.0;

/// Derived per-record features, aligned 1:1 with the input batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub sales: f64,
    /// Decimal hours
    pub open: f64,
    /// Decimal hours, past 24 when the establishment closes after midnight
    pub close: f64,
    pub duration: f64,
    /// (sales, open, close), each scaled into [0, 1]
    pub normalized: [f64; 3],
}

/// Parse "HH:MM" or "HH:MM:SS" into decimal hours. "24:00" is end of day.
pub fn parse_hours(value: &str) -> Option<f64> {
    let value = value.trim();
    if matches!(value, "24:00" | "24:00:00") {
        return Some(HOURS_PER_DAY);
    }
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()?;
    Some(time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0)
}

fn sales_of(record: &EstablishmentRecord) -> f64 {
    record.average_sales.filter(|s| s.is_finite()).unwrap_or(0.0)
}

fn hours_of(record: &EstablishmentRecord) -> (f64, f64) {
    let open = record
        .open_time
        .as_deref()
        .and_then(parse_hours)
        .unwrap_or(DEFAULT_OPEN_HOUR);
    let mut close = record
        .close_time
        .as_deref()
        .and_then(parse_hours)
        .unwrap_or(DEFAULT_CLOSE_HOUR);
    if close < open {
        close += HOURS_PER_DAY;
    }
    (open, close)
}

/// Build the feature vectors for a batch. Sales are normalized by the batch
/// maximum (never less than 1), times by 24.
pub fn extract_features(records: &[EstablishmentRecord]) -> Vec<FeatureVector> {
    let max_sales = records
        .iter()
        .map(sales_of)
        .fold(1.0_f64, f64::max);

    records
        .iter()
        .map(|record| {
            let sales = sales_of(record);
            let (open, close) = hours_of(record);
            FeatureVector {
                sales,
                open,
                close,
                duration: close - open,
                normalized: [sales / max_sales, open / HOURS_PER_DAY, close / HOURS_PER_DAY],
            }
        })
        .collect()
}
