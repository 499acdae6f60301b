//! Shared planning logic for the HTTP API
//!
//! Holds the current dataset snapshot (establishments, teams, telemetry) and
//! runs the core computations over a private copy on every request.

use crate::ai::{self, AiService};
use crate::config::PlannerConfig;
use crate::coverage::{compute_coverage, CoverageReport};
use crate::error::{PlannerError, Result};
use crate::health::{join_health_data, summarize_health, HealthSummary, TelemetryTable};
use crate::ingest;
use crate::models::{EstablishmentRecord, Team};
use crate::portfolio::apply_portfolio_rules;
use crate::profiles::{segment, ClusterProfile};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub establishments: Vec<EstablishmentRecord>,
    pub teams: Vec<Team>,
    pub telemetry: Option<TelemetryTable>,
}

impl Dataset {
    /// Load from the configured files. A missing teams file means no teams.
    pub fn load(config: &PlannerConfig) -> Result<Self> {
        let establishments = ingest::load_establishments_csv(&config.establishments_path)?;
        let teams = if config.teams_path.exists() {
            ingest::load_teams_json(&config.teams_path)?
        } else {
            info!("No teams file at {:?}, starting without teams", config.teams_path);
            Vec::new()
        };
        let telemetry = config
            .telemetry_path
            .as_ref()
            .map(ingest::load_telemetry_json)
            .transpose()?;
        Ok(Self {
            establishments,
            teams,
            telemetry,
        })
    }

    /// Telemetry join followed by portfolio reconciliation
    pub fn reconciled(&self) -> Vec<EstablishmentRecord> {
        let enriched = join_health_data(&self.establishments, self.telemetry.as_ref());
        apply_portfolio_rules(&enriched, &self.teams)
    }
}

// ============================================================================
// Planner Service
// ============================================================================

/// Dataset plus a counter bumped on every write
#[derive(Debug, Default)]
struct Stored {
    dataset: Dataset,
    generation: u64,
}

pub struct PlannerService {
    stored: Arc<RwLock<Stored>>,
    cached_records: Arc<RwLock<Option<Vec<EstablishmentRecord>>>>,
    ai: Option<Arc<dyn AiService>>,
}

impl PlannerService {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            stored: Arc::new(RwLock::new(Stored { dataset, generation: 0 })),
            cached_records: Arc::new(RwLock::new(None)),
            ai: None,
        }
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiService>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }

    pub async fn snapshot(&self) -> Dataset {
        self.stored.read().await.dataset.clone()
    }

    /// Enriched and portfolio-reconciled establishments
    pub async fn establishments(&self) -> Vec<EstablishmentRecord> {
        // Check cache first
        {
            let cache = self.cached_records.read().await;
            if let Some(records) = cache.as_ref() {
                return records.clone();
            }
        }

        // Lock order is always stored -> cache; the cache is filled while the
        // dataset guard is held so a concurrent replace cannot be skipped.
        let stored = self.stored.read().await;
        let records = stored.dataset.reconciled();
        *self.cached_records.write().await = Some(records.clone());
        records
    }

    async fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut Dataset),
    {
        let mut stored = self.stored.write().await;
        apply(&mut stored.dataset);
        stored.generation += 1;
        *self.cached_records.write().await = None;
    }

    pub async fn replace_establishments(&self, establishments: Vec<EstablishmentRecord>) {
        info!(count = establishments.len(), "replacing establishments");
        self.update(|d| d.establishments = establishments).await;
    }

    pub async fn replace_teams(&self, teams: Vec<Team>) {
        info!(count = teams.len(), "replacing teams");
        self.update(|d| d.teams = teams).await;
    }

    pub async fn replace_telemetry(&self, telemetry: TelemetryTable) {
        info!(count = telemetry.len(), "replacing telemetry");
        self.update(|d| d.telemetry = Some(telemetry)).await;
    }

    pub async fn segments(&self) -> Vec<ClusterProfile> {
        segment(&self.establishments().await)
    }

    pub async fn coverage(&self) -> CoverageReport {
        let teams = self.stored.read().await.dataset.teams.clone();
        compute_coverage(&self.establishments().await, &teams)
    }

    pub async fn health_summary(&self) -> HealthSummary {
        summarize_health(&self.establishments().await)
    }

    /// Distribute pending establishments through the routing assistant.
    /// The stored dataset only changes when the whole round trip succeeds and
    /// nothing else was written in the meantime; otherwise `Conflict`.
    pub async fn distribute(&self) -> Result<Vec<EstablishmentRecord>> {
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| PlannerError::Config("routing assistant is not configured".to_string()))?;

        let (records, teams, generation) = {
            let stored = self.stored.read().await;
            (stored.dataset.reconciled(), stored.dataset.teams.clone(), stored.generation)
        };
        let updated = ai::request_distribution(ai.as_ref(), &records, &teams).await?;

        let mut stored = self.stored.write().await;
        if stored.generation != generation {
            warn!(
                started = generation,
                current = stored.generation,
                "dataset changed during distribution, discarding result"
            );
            return Err(PlannerError::Conflict(
                "dataset changed while the routing assistant was running".to_string(),
            ));
        }
        stored.dataset.establishments = updated.clone();
        stored.generation += 1;
        *self.cached_records.write().await = None;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::models::{ServiceRegion, TeamMember, FIXED_PORTFOLIO_REASON};
    use tokio::sync::Notify;

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl AiService for FixedAnswer {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Answers only after `release` is notified
    struct GatedAnswer {
        entered: Notify,
        release: Notify,
        answer: &'static str,
    }

    #[async_trait]
    impl AiService for GatedAnswer {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.answer.to_string())
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            establishments: vec![
                EstablishmentRecord::new("e1", "Padaria Silva").with_location("", "Pinheiros", "São Paulo"),
                EstablishmentRecord::new("e2", "Mercado Bom").with_location("", "Centro", "Campinas"),
            ],
            teams: vec![Team {
                id: "t1".into(),
                name: "Capital".into(),
                is_active: true,
                max_activities_per_route: 5,
                regions: vec![ServiceRegion { city: "São Paulo".into(), neighborhood: None }],
                members: vec![TeamMember {
                    id: "m1".into(),
                    name: "Ana".into(),
                    portfolio: vec!["padaria silva".into()],
                    ..Default::default()
                }],
            }],
            telemetry: None,
        }
    }

    #[tokio::test]
    async fn test_reconciled_records() {
        let service = PlannerService::new(dataset());
        let records = service.establishments().await;
        assert_eq!(records[0].assignment_reason.as_deref(), Some(FIXED_PORTFOLIO_REASON));
        assert!(records.iter().all(|r| r.health_data.is_some()));

        let coverage = service.coverage().await;
        assert_eq!(coverage.baseline_capacity, 5);
        assert_eq!(coverage.assigned_visits, 1);
        assert_eq!(coverage.uncovered_regions, vec!["Centro - Campinas".to_string()]);
    }

    #[tokio::test]
    async fn test_replace_invalidates_cache() {
        let service = PlannerService::new(dataset());
        assert_eq!(service.establishments().await.len(), 2);
        service
            .replace_establishments(vec![EstablishmentRecord::new("x", "Outro")])
            .await;
        assert_eq!(service.establishments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_distribute_requires_ai() {
        let service = PlannerService::new(dataset());
        assert!(matches!(service.distribute().await, Err(PlannerError::Config(_))));
    }

    #[tokio::test]
    async fn test_failed_distribution_keeps_state() {
        let service = PlannerService::new(dataset()).with_ai(Arc::new(FixedAnswer(r#"{"e2": {"teamId": "nope"}}"#)));
        assert!(service.distribute().await.is_err());
        let snapshot = service.snapshot().await;
        assert!(snapshot.establishments.iter().all(|r| r.team_id.is_none()));
    }

    #[tokio::test]
    async fn test_distribution_commits() {
        let service = PlannerService::new(dataset()).with_ai(Arc::new(FixedAnswer(r#"{"e2": {"teamId": "t1", "memberId": "m1"}}"#)));
        let updated = service.distribute().await.unwrap();
        assert_eq!(updated[1].team_id.as_deref(), Some("t1"));
        assert_eq!(service.coverage().await.pending_visits, 0);
    }

    #[tokio::test]
    async fn test_distribution_rejected_after_concurrent_replace() {
        let gate = Arc::new(GatedAnswer {
            entered: Notify::new(),
            release: Notify::new(),
            answer: r#"{"e2": {"teamId": "t1", "memberId": "m1"}}"#,
        });
        let service = Arc::new(PlannerService::new(dataset()).with_ai(gate.clone()));

        let running = {
            let service = service.clone();
            tokio::spawn(async move { service.distribute().await })
        };
        gate.entered.notified().await;
        service
            .replace_establishments(vec![EstablishmentRecord::new("x", "Outro")])
            .await;
        gate.release.notify_one();

        let result = running.await.unwrap();
        assert!(matches!(result, Err(PlannerError::Conflict(_))));

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.establishments.len(), 1);
        assert_eq!(snapshot.establishments[0].id, "x");
        assert_eq!(service.establishments().await[0].id, "x");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cache_follows_latest_replace_under_concurrent_reads() {
        let service = Arc::new(PlannerService::new(dataset()));

        for round in 0..20 {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let service = service.clone();
                    tokio::spawn(async move { service.establishments().await.len() })
                })
                .collect();

            let records = (0..=round % 3)
                .map(|i| EstablishmentRecord::new(format!("r{}", i), format!("Loja {}", i)))
                .collect::<Vec<_>>();
            let expected = records.len();
            service.replace_establishments(records).await;

            for reader in readers {
                reader.await.unwrap();
            }
            assert_eq!(service.establishments().await.len(), expected);
        }
    }
}
