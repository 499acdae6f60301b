//! Error type shared by the collaborator boundaries (files, HTTP, assistant JSON).
//!
//! Data-quality problems inside the core never surface here; they degrade to
//! defaults instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("routing service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("routing service returned {status}: {body}")]
    ServiceStatus { status: u16, body: String },

    #[error("malformed routing response: {0}")]
    MalformedResponse(String),

    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("unknown member {member} in team {team}")]
    UnknownMember { team: String, member: String },

    #[error("unknown establishment: {0}")]
    UnknownEstablishment(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("conflicting update: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// True when the failure came from the external routing service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PlannerError::Http(_) | PlannerError::ServiceStatus { .. } | PlannerError::MalformedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(PlannerError::MalformedResponse("x".into()).is_upstream());
        assert!(PlannerError::ServiceStatus { status: 500, body: String::new() }.is_upstream());
        assert!(!PlannerError::UnknownTeam("t1".into()).is_upstream());
        assert!(!PlannerError::Conflict("x".into()).is_upstream());
    }

    #[test]
    fn test_display_messages() {
        let err = PlannerError::UnknownMember { team: "t1".into(), member: "m9".into() };
        assert_eq!(err.to_string(), "unknown member m9 in team t1");
    }
}
