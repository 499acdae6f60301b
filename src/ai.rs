//! Boundary with the external routing assistant.
//!
//! The assistant receives a prompt with the visits and teams embedded as JSON
//! and answers with JSON: an activity -> team/member map for distribution, or
//! an array of day plans for routing. Anything that does not parse into those
//! shapes is a hard failure and the caller's data stays as it was.

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::models::{EstablishmentRecord, Team, FIXED_PORTFOLIO_REASON};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};

/// Reason stamped when the assistant gives none
pub const DEFAULT_DISTRIBUTION_REASON: &str = "Automatic distribution";

/// Text completion service. One prompt in, raw model text out.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionEntry {
    pub team_id: String,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub type DistributionMap = BTreeMap<String, DistributionEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedVisit {
    pub establishment_id: String,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub visits: Vec<PlannedVisit>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Strip a surrounding Markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_distribution(text: &str) -> Result<DistributionMap> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| PlannerError::MalformedResponse(format!("expected an activity map: {}", e)))
}

pub fn parse_route_plan(text: &str) -> Result<Vec<DayPlan>> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| PlannerError::MalformedResponse(format!("expected an array of day plans: {}", e)))
}

// ============================================================================
// Applying results
// ============================================================================

/// Check every entry first, then return a new record list with the
/// assignments applied. Portfolio-bound records keep their owner.
pub fn apply_distribution(
    records: &[EstablishmentRecord],
    teams: &[Team],
    mapping: &DistributionMap,
) -> Result<Vec<EstablishmentRecord>> {
    let known: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

    for (activity_id, entry) in mapping {
        if !known.contains(activity_id.as_str()) {
            return Err(PlannerError::UnknownEstablishment(activity_id.clone()));
        }
        let team = teams
            .iter()
            .find(|t| t.id == entry.team_id)
            .ok_or_else(|| PlannerError::UnknownTeam(entry.team_id.clone()))?;
        if let Some(member_id) = &entry.member_id {
            if team.member(member_id).is_none() {
                return Err(PlannerError::UnknownMember {
                    team: team.id.clone(),
                    member: member_id.clone(),
                });
            }
        }
    }

    Ok(records
        .iter()
        .map(|record| {
            let fixed = record.assignment_reason.as_deref() == Some(FIXED_PORTFOLIO_REASON);
            match mapping.get(&record.id) {
                Some(entry) if !fixed => EstablishmentRecord {
                    team_id: Some(entry.team_id.clone()),
                    member_id: entry.member_id.clone(),
                    assignment_reason: Some(
                        entry
                            .reason
                            .clone()
                            .unwrap_or_else(|| DEFAULT_DISTRIBUTION_REASON.to_string()),
                    ),
                    ..record.clone()
                },
                _ => record.clone(),
            }
        })
        .collect())
}

// ============================================================================
// Prompts
// ============================================================================

fn activities_json(records: &[EstablishmentRecord]) -> serde_json::Value {
    records
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "name": r.name,
                "address": r.address,
                "neighborhood": r.neighborhood,
                "municipality": r.municipality,
                "openTime": r.open_time,
                "closeTime": r.close_time,
                "averageSales": r.average_sales,
                "teamId": r.team_id,
                "memberId": r.member_id,
            })
        })
        .collect()
}

fn teams_json(teams: &[Team]) -> serde_json::Value {
    teams
        .iter()
        .filter(|t| t.is_active)
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "maxActivitiesPerRoute": t.max_activities_per_route,
                "regions": t.regions,
                "members": t.available_members().map(|m| json!({
                    "id": m.id,
                    "name": m.name,
                    "schedule": m.schedule,
                })).collect::<Vec<_>>(),
            })
        })
        .collect()
}

pub fn distribution_prompt(records: &[EstablishmentRecord], teams: &[Team]) -> String {
    format!(
        "Distribute the field activities below among the teams and members.\n\
         Respect each team's service regions and its maximum activities per route.\n\
         Answer ONLY with a JSON object mapping activity id to \
         {{\"teamId\": string, \"memberId\": string, \"reason\": string}}.\n\n\
         ACTIVITIES:\n{}\n\nTEAMS:\n{}\n",
        activities_json(records),
        teams_json(teams)
    )
}

pub fn route_plan_prompt(records: &[EstablishmentRecord], teams: &[Team], start: NaiveDate, days: u32) -> String {
    format!(
        "Build a day-by-day visit itinerary starting on {} covering at most {} days.\n\
         Visit each establishment within its opening hours and note weather and risk.\n\
         Answer ONLY with a JSON array of objects \
         {{\"day\": number, \"date\": \"YYYY-MM-DD\", \"visits\": [{{\"establishmentId\": string, \
         \"arrival\": \"HH:MM\", \"departure\": \"HH:MM\", \"weather\": string, \"risk\": string}}]}}.\n\n\
         ACTIVITIES:\n{}\n\nTEAMS:\n{}\n",
        start.format("%Y-%m-%d"),
        days,
        activities_json(records),
        teams_json(teams)
    )
}

// ============================================================================
// Round trips
// ============================================================================

/// Ask the assistant to distribute unassigned establishments.
/// Returns the full record list with the new assignments.
pub async fn request_distribution(
    service: &dyn AiService,
    records: &[EstablishmentRecord],
    teams: &[Team],
) -> Result<Vec<EstablishmentRecord>> {
    let pending: Vec<EstablishmentRecord> = records.iter().filter(|r| !r.is_assigned()).cloned().collect();
    if pending.is_empty() {
        info!("nothing to distribute");
        return Ok(records.to_vec());
    }

    info!(pending = pending.len(), teams = teams.len(), "requesting distribution");
    let text = service.complete(&distribution_prompt(&pending, teams)).await.inspect_err(|e| {
        warn!(error = %e, "distribution request failed");
    })?;
    let mapping = parse_distribution(&text)?;
    let updated = apply_distribution(records, teams, &mapping)?;
    info!(assigned = mapping.len(), "distribution applied");
    Ok(updated)
}

/// Ask the assistant for an itinerary. Visits must reference known establishments.
pub async fn request_route_plan(
    service: &dyn AiService,
    records: &[EstablishmentRecord],
    teams: &[Team],
    start: NaiveDate,
    days: u32,
) -> Result<Vec<DayPlan>> {
    info!(records = records.len(), days, "requesting route plan");
    let text = service
        .complete(&route_plan_prompt(records, teams, start, days))
        .await
        .inspect_err(|e| warn!(error = %e, "route plan request failed"))?;
    let plan = parse_route_plan(&text)?;

    let known: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    if let Some(visit) = plan
        .iter()
        .flat_map(|d| d.visits.iter())
        .find(|v| !known.contains(v.establishment_id.as_str()))
    {
        return Err(PlannerError::UnknownEstablishment(visit.establishment_id.clone()));
    }
    Ok(plan)
}

// ============================================================================
// HTTP client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client. No retries.
#[derive(Debug, Clone)]
pub struct HttpAiService {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpAiService {
    pub fn new(endpoint: &str, api_key: Option<String>, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key,
            model: model.to_string(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// `None` when no endpoint is configured
    pub fn from_config(config: &PlannerConfig) -> Result<Option<Self>> {
        config
            .ai_endpoint
            .as_deref()
            .map(|endpoint| {
                Self::new(
                    endpoint,
                    config.ai_api_key.clone(),
                    &config.ai_model,
                    Duration::from_secs(config.ai_timeout_secs),
                )
            })
            .transpose()
    }

    async fn post(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PlannerError::ServiceStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| PlannerError::MalformedResponse(format!("unexpected completion body: {}", e)))?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PlannerError::MalformedResponse("completion has no content".to_string()))
    }
}

#[async_trait]
impl AiService for HttpAiService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.post(prompt).await
    }
}
