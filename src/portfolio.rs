//! Fixed portfolio bindings.
//!
//! A member's portfolio is a list of client names it always serves. Unassigned
//! establishments whose normalized name equals a portfolio entry are bound to
//! the first such member, scanning active teams in order and members in order.

use crate::models::{EstablishmentRecord, Team, FIXED_PORTFOLIO_REASON};
use crate::text::normalize_name;
use tracing::{debug, info};

/// Team and member that claim `name` through a portfolio, if any
pub fn find_portfolio_owner<'a>(name: &str, teams: &'a [Team]) -> Option<(&'a Team, &'a str)> {
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return None;
    }
    teams
        .iter()
        .filter(|t| t.is_active)
        .flat_map(|t| t.members.iter().map(move |m| (t, m)))
        .find(|(_, m)| m.portfolio.iter().any(|entry| normalize_name(entry) == wanted))
        .map(|(t, m)| (t, m.id.as_str()))
}

/// Bind unassigned records to portfolio owners, returning a new list.
/// Records that already have a team are left as they are.
pub fn apply_portfolio_rules(records: &[EstablishmentRecord], teams: &[Team]) -> Vec<EstablishmentRecord> {
    let mut claimed = 0usize;
    let updated = records
        .iter()
        .map(|record| {
            if record.is_assigned() {
                return record.clone();
            }
            match find_portfolio_owner(&record.name, teams) {
                Some((team, member_id)) => {
                    claimed += 1;
                    debug!(id = %record.id, team = %team.id, member = %member_id, "portfolio claim");
                    EstablishmentRecord {
                        team_id: Some(team.id.clone()),
                        member_id: Some(member_id.to_string()),
                        assignment_reason: Some(FIXED_PORTFOLIO_REASON.to_string()),
                        ..record.clone()
                    }
                }
                None => record.clone(),
            }
        })
        .collect();
    info!(records = records.len(), claimed, "portfolio rules applied");
    updated
}
