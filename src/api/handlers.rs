//! REST API handlers for the visit planner
//!
//! These handlers use the shared PlannerService.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::service::PlannerService;
use crate::coverage::CoverageReport;
use crate::error::PlannerError;
use crate::health::{HealthSummary, TelemetryTable};
use crate::models::{EstablishmentRecord, Team};
use crate::profiles::ClusterProfile;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacedResponse {
    pub replaced: usize,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: PlannerError) -> ApiError {
    let status = match &e {
        PlannerError::Http(_) | PlannerError::ServiceStatus { .. } | PlannerError::MalformedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        PlannerError::UnknownTeam(_) | PlannerError::UnknownMember { .. } | PlannerError::UnknownEstablishment(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlannerError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        PlannerError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(status = status.as_u16(), error = %e, "request failed");
    (status, Json(ErrorResponse { error: e.to_string() }))
}

/// Malformed or mistyped request bodies get the same JSON error shape
fn rejection_response(rejection: JsonRejection) -> ApiError {
    let status = rejection.status();
    tracing::warn!(status = status.as_u16(), error = %rejection.body_text(), "rejected request body");
    (status, Json(ErrorResponse { error: rejection.body_text() }))
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<PlannerService>;

/// GET /api/v1/health
pub async fn health(State(service): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "routingAssistant": service.ai_enabled()}))
}

/// GET /api/v1/establishments
pub async fn get_establishments(State(service): State<AppState>) -> Json<Vec<EstablishmentRecord>> {
    Json(service.establishments().await)
}

/// PUT /api/v1/establishments
pub async fn put_establishments(
    State(service): State<AppState>,
    payload: Result<Json<Vec<EstablishmentRecord>>, JsonRejection>,
) -> Result<Json<ReplacedResponse>, ApiError> {
    let Json(records) = payload.map_err(rejection_response)?;
    let replaced = records.len();
    service.replace_establishments(records).await;
    Ok(Json(ReplacedResponse { replaced }))
}

/// PUT /api/v1/teams
pub async fn put_teams(
    State(service): State<AppState>,
    payload: Result<Json<Vec<Team>>, JsonRejection>,
) -> Result<Json<ReplacedResponse>, ApiError> {
    let Json(teams) = payload.map_err(rejection_response)?;
    let replaced = teams.len();
    service.replace_teams(teams).await;
    Ok(Json(ReplacedResponse { replaced }))
}

/// PUT /api/v1/telemetry
pub async fn put_telemetry(
    State(service): State<AppState>,
    payload: Result<Json<TelemetryTable>, JsonRejection>,
) -> Result<Json<ReplacedResponse>, ApiError> {
    let Json(table) = payload.map_err(rejection_response)?;
    let replaced = table.len();
    service.replace_telemetry(table).await;
    Ok(Json(ReplacedResponse { replaced }))
}

/// GET /api/v1/segments
pub async fn get_segments(State(service): State<AppState>) -> Json<Vec<ClusterProfile>> {
    Json(service.segments().await)
}

/// GET /api/v1/coverage
pub async fn get_coverage(State(service): State<AppState>) -> Json<CoverageReport> {
    Json(service.coverage().await)
}

/// GET /api/v1/health-summary
pub async fn get_health_summary(State(service): State<AppState>) -> Json<HealthSummary> {
    Json(service.health_summary().await)
}

/// POST /api/v1/distribute
pub async fn distribute(State(service): State<AppState>) -> Result<Json<Vec<EstablishmentRecord>>, ApiError> {
    service.distribute().await.map(Json).map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let status = |e: PlannerError| error_response(e).0;
        assert_eq!(status(PlannerError::Conflict("changed".into())), StatusCode::CONFLICT);
        assert_eq!(status(PlannerError::Config("off".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(PlannerError::UnknownTeam("t9".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(PlannerError::MalformedResponse("x".into())), StatusCode::BAD_GATEWAY);
    }
}
