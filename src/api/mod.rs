//! API module for the visit planner
//!
//! REST interface over the planning core.

pub mod handlers;
pub mod service;

pub use service::{Dataset, PlannerService};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<PlannerService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        // Dataset
        .route(
            "/api/v1/establishments",
            get(handlers::get_establishments).put(handlers::put_establishments),
        )
        .route("/api/v1/teams", axum::routing::put(handlers::put_teams))
        .route("/api/v1/telemetry", axum::routing::put(handlers::put_telemetry))
        // Analysis
        .route("/api/v1/segments", get(handlers::get_segments))
        .route("/api/v1/coverage", get(handlers::get_coverage))
        .route("/api/v1/health-summary", get(handlers::get_health_summary))
        // Routing assistant
        .route("/api/v1/distribute", post(handlers::distribute))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EstablishmentRecord;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let records = (0..6)
            .map(|i| EstablishmentRecord::new(format!("e{}", i), format!("Loja {}", i)).with_sales(100.0 * (i + 1) as f64))
            .collect();
        create_router(Arc::new(PlannerService::new(Dataset {
            establishments: records,
            ..Default::default()
        })))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_route() {
        let (status, body) = get_json(app(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["routingAssistant"], false);
    }

    #[tokio::test]
    async fn test_segments_route() {
        let (status, body) = get_json(app(), "/api/v1/segments").await;
        assert_eq!(status, StatusCode::OK);
        let profiles = body.as_array().unwrap();
        assert!(!profiles.is_empty() && profiles.len() <= 4);
        assert_eq!(profiles[0]["label"], "High Performance");
    }

    #[tokio::test]
    async fn test_distribute_without_assistant() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/distribute")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_put_teams_then_coverage() {
        let app = app();
        let teams = r#"[{"id":"t1","name":"A","maxActivitiesPerRoute":3,"members":[{"id":"m1","name":"Ana"},{"id":"m2","name":"Bia","isOnVacation":true}]}]"#;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/teams")
                    .header("content-type", "application/json")
                    .body(Body::from(teams))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, body) = get_json(app, "/api/v1/coverage").await;
        assert_eq!(body["baselineCapacity"], 3);
        assert_eq!(body["pendingVisits"], 6);
        assert_eq!(body["capacityHealth"], 50);
    }

    #[tokio::test]
    async fn test_invalid_json_body_uses_error_shape() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/teams")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        // Wrong shape is a 422 with the same body
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/establishments")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": "e1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        // Nothing was replaced
        let (_, records) = get_json(app, "/api/v1/establishments").await;
        assert_eq!(records.as_array().unwrap().len(), 6);
    }
}
