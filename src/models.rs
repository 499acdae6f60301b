use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Assignment reason stamped on records bound by a member's fixed portfolio.
pub const FIXED_PORTFOLIO_REASON: &str = "Fixed Portfolio";

/// One physical business location to be visited.
///
/// The typed fields are the only ones the core relies on. Any other column
/// coming from the spreadsheet lands in `extra` and is carried along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstablishmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub average_sales: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub municipality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_reason: Option<String>,
    /// `None` means no telemetry is known; `Some(vec![])` means zero devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_data: Option<Vec<DeviceHealthRecord>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EstablishmentRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sales(mut self, sales: f64) -> Self {
        self.average_sales = Some(sales);
        self
    }

    pub fn with_hours(mut self, open: &str, close: &str) -> Self {
        self.open_time = Some(open.to_string());
        self.close_time = Some(close.to_string());
        self
    }

    pub fn with_location(mut self, address: &str, neighborhood: &str, municipality: &str) -> Self {
        self.address = address.to_string();
        self.neighborhood = neighborhood.to_string();
        self.municipality = municipality.to_string();
        self
    }

    pub fn is_assigned(&self) -> bool {
        self.team_id.is_some()
    }
}

/// Accepts a number, a numeric string, or anything else (which becomes `None`).
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// Paper / consumable level reported by a terminal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaperStatus {
    #[serde(rename = "OK")]
    Ok,
    Low,
    Empty,
}

/// Health telemetry for one payment terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealthRecord {
    pub machine_id: String,
    pub model: String,
    /// 0-100
    pub signal_strength: f64,
    /// 0-100
    pub battery_level: f64,
    /// 0-10, read as a percentage
    pub error_rate: f64,
    pub paper_status: PaperStatus,
    pub firmware_version: String,
    #[serde(default)]
    pub incidents: u32,
    #[serde(default)]
    pub avg_uptime: f64,
    #[serde(default)]
    pub last_update: String,
}

/// City + optional neighborhood served by a team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegion {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

/// Weekly availability of a collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSchedule {
    pub days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_on_vacation: bool,
    /// Client names this member always serves, regardless of region.
    #[serde(default)]
    pub portfolio: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<WorkSchedule>,
}

impl TeamMember {
    /// Members without a schedule are treated as available every day.
    pub fn works_on(&self, day: Weekday) -> bool {
        match &self.schedule {
            Some(schedule) => schedule.days.contains(&day),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub max_activities_per_route: u32,
    #[serde(default)]
    pub regions: Vec<ServiceRegion>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

fn default_active() -> bool {
    true
}

impl Team {
    pub fn available_members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.iter().filter(|m| !m.is_on_vacation)
    }

    pub fn member(&self, member_id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_extra_columns() {
        let json = r#"{"id":"e1","name":"Padaria","averageSales":"1500","openTime":"07:00","cnpj":"123"}"#;
        let record: EstablishmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.average_sales, Some(1500.0));
        assert_eq!(record.open_time.as_deref(), Some("07:00"));
        assert_eq!(record.extra.get("cnpj"), Some(&serde_json::json!("123")));
        assert!(record.health_data.is_none());
    }

    #[test]
    fn test_unparsable_sales_is_absent() {
        let json = r#"{"id":"e1","name":"Bar","averageSales":"n/a"}"#;
        let record: EstablishmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.average_sales, None);
    }

    #[test]
    fn test_team_defaults() {
        let json = r#"{"id":"t1","name":"Norte","maxActivitiesPerRoute":20,
            "members":[{"id":"m1","name":"Ana","schedule":{"days":["Mon","Tue"]}}]}"#;
        let team: Team = serde_json::from_str(json).unwrap();
        assert!(team.is_active);
        assert_eq!(team.available_members().count(), 1);
        assert!(team.members[0].works_on(Weekday::Mon));
        assert!(!team.members[0].works_on(Weekday::Sun));
    }

    #[test]
    fn test_paper_status_wire_names() {
        let status: PaperStatus = serde_json::from_str("\"OK\"").unwrap();
        assert_eq!(status, PaperStatus::Ok);
        assert_eq!(serde_json::to_string(&PaperStatus::Empty).unwrap(), "\"Empty\"");
    }
}
