//! Runtime configuration.
//!
//! Values come from `PLANNER_*` environment variables; binaries layer their
//! command-line flags on top.
//!
//! Environment variables:
//!   PLANNER_ESTABLISHMENTS - establishments CSV (default: data/establishments.csv)
//!   PLANNER_TEAMS          - teams JSON (default: data/teams.json)
//!   PLANNER_TELEMETRY      - terminal telemetry JSON (optional, mock data when unset)
//!   PLANNER_AI_URL         - chat-completions endpoint of the routing assistant
//!   PLANNER_AI_KEY         - bearer token for the routing assistant
//!   PLANNER_AI_MODEL       - model name (default: gpt-4o-mini)
//!   PLANNER_AI_TIMEOUT     - request timeout in seconds (default: 120)
//!   PLANNER_PORT           - API server port (default: 8080)

use crate::error::{PlannerError, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub establishments_path: PathBuf,
    pub teams_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub ai_endpoint: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub port: u16,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            establishments_path: PathBuf::from("data/establishments.csv"),
            teams_path: PathBuf::from("data/teams.json"),
            telemetry_path: None,
            ai_endpoint: None,
            ai_api_key: None,
            ai_model: "gpt-4o-mini".to_string(),
            ai_timeout_secs: 120,
            port: 8080,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("PLANNER_ESTABLISHMENTS") {
            config.establishments_path = PathBuf::from(v);
        }
        if let Some(v) = get("PLANNER_TEAMS") {
            config.teams_path = PathBuf::from(v);
        }
        config.telemetry_path = get("PLANNER_TELEMETRY").map(PathBuf::from);
        config.ai_endpoint = get("PLANNER_AI_URL");
        config.ai_api_key = get("PLANNER_AI_KEY");
        if let Some(v) = get("PLANNER_AI_MODEL") {
            config.ai_model = v;
        }
        if let Some(v) = get("PLANNER_AI_TIMEOUT") {
            config.ai_timeout_secs = v
                .parse()
                .map_err(|_| PlannerError::Config(format!("PLANNER_AI_TIMEOUT must be seconds, got {:?}", v)))?;
        }
        if let Some(v) = get("PLANNER_PORT") {
            config.port = v
                .parse()
                .map_err(|_| PlannerError::Config(format!("PLANNER_PORT must be a port number, got {:?}", v)))?;
        }
        Ok(config)
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_endpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert!(!config.ai_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = PlannerConfig::from_lookup(lookup(&[
            ("PLANNER_TELEMETRY", "data/pos.json"),
            ("PLANNER_AI_URL", "http://localhost:9000/v1/chat/completions"),
            ("PLANNER_PORT", "9090"),
            ("PLANNER_AI_MODEL", " "),
        ]))
        .unwrap();
        assert_eq!(config.telemetry_path, Some(PathBuf::from("data/pos.json")));
        assert_eq!(config.port, 9090);
        assert_eq!(config.ai_model, "gpt-4o-mini");
        assert!(config.ai_enabled());
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = PlannerConfig::from_lookup(lookup(&[("PLANNER_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }
}
