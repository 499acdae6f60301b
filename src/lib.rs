//! Visit planning core for field sales and service teams.
//!
//! Segments establishments into operational profiles, joins payment
//! terminal telemetry, reconciles fixed portfolios and reports team
//! coverage. Route generation itself is delegated to an external
//! assistant behind [`ai::AiService`].

pub mod ai;
pub mod api;
pub mod config;
pub mod coverage;
pub mod error;
pub mod features;
pub mod health;
pub mod ingest;
pub mod kmeans;
pub mod logging;
pub mod models;
pub mod portfolio;
pub mod profiles;
pub mod text;

pub use error::{PlannerError, Result};
pub use models::{DeviceHealthRecord, EstablishmentRecord, PaperStatus, ServiceRegion, Team, TeamMember};
