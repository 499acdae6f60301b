//! Capacity and geographic coverage across the active teams.

use crate::models::{EstablishmentRecord, ServiceRegion, Team};
use crate::text::{loose_match, truncate_display};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// Display cap for the uncovered region list
pub const MAX_UNCOVERED_REGIONS: usize = 50;
/// Address labels are cut to this many characters
pub const ADDRESS_LABEL_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub active_teams: usize,
    pub available_members: usize,
    pub baseline_capacity: u64,
    pub assigned_visits: usize,
    pub pending_visits: usize,
    pub remaining_capacity: u64,
    /// 0-100
    pub capacity_health: u32,
    /// Unassigned establishments no active team region covers
    pub uncovered_count: usize,
    /// Deduplicated display labels, capped at 50
    pub uncovered_regions: Vec<String>,
}

/// Σ over active teams of max activities per route × non-vacationing members
pub fn baseline_capacity(teams: &[Team]) -> u64 {
    teams
        .iter()
        .filter(|t| t.is_active)
        .map(|t| t.max_activities_per_route as u64 * t.available_members().count() as u64)
        .sum()
}

/// Share of pending demand that remaining capacity can absorb, 0-100
pub fn capacity_health(remaining: u64, pending: usize) -> u32 {
    if pending == 0 {
        return 100;
    }
    if remaining == 0 {
        return 0;
    }
    let pct = (remaining as f64 / pending as f64 * 100.0).round();
    pct.min(100.0) as u32
}

/// City must match; an unspecified team neighborhood covers the whole city.
pub fn region_matches(region: &ServiceRegion, record: &EstablishmentRecord) -> bool {
    if !loose_match(&region.city, &record.municipality) {
        return false;
    }
    match region.neighborhood.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(neighborhood) => loose_match(neighborhood, &record.neighborhood),
    }
}

pub fn is_covered(record: &EstablishmentRecord, teams: &[Team]) -> bool {
    teams
        .iter()
        .filter(|t| t.is_active)
        .flat_map(|t| t.regions.iter())
        .any(|region| region_matches(region, record))
}

/// "Neighborhood - Municipality", else a shortened address, else the name
pub fn region_label(record: &EstablishmentRecord) -> String {
    let neighborhood = record.neighborhood.trim();
    let municipality = record.municipality.trim();
    if !neighborhood.is_empty() {
        if municipality.is_empty() {
            neighborhood.to_string()
        } else {
            format!("{} - {}", neighborhood, municipality)
        }
    } else if !record.address.trim().is_empty() {
        truncate_display(&record.address, ADDRESS_LABEL_CHARS)
    } else {
        record.name.trim().to_string()
    }
}

pub fn compute_coverage(records: &[EstablishmentRecord], teams: &[Team]) -> CoverageReport {
    let active: Vec<&Team> = teams.iter().filter(|t| t.is_active).collect();
    let available_members: usize = active.iter().map(|t| t.available_members().count()).sum();

    let baseline = baseline_capacity(teams);
    let assigned = records.iter().filter(|r| r.is_assigned()).count();
    let pending = records.len() - assigned;
    let remaining = baseline.saturating_sub(assigned as u64);

    let mut seen = HashSet::new();
    let mut uncovered_regions = Vec::new();
    let mut uncovered_count = 0usize;
    for record in records.iter().filter(|r| !r.is_assigned()) {
        if is_covered(record, teams) {
            continue;
        }
        uncovered_count += 1;
        let label = region_label(record);
        if uncovered_regions.len() < MAX_UNCOVERED_REGIONS && seen.insert(label.clone()) {
            uncovered_regions.push(label);
        }
    }

    let report = CoverageReport {
        active_teams: active.len(),
        available_members,
        baseline_capacity: baseline,
        assigned_visits: assigned,
        pending_visits: pending,
        remaining_capacity: remaining,
        capacity_health: capacity_health(remaining, pending),
        uncovered_count,
        uncovered_regions,
    };
    info!(
        baseline = report.baseline_capacity,
        remaining = report.remaining_capacity,
        pending = report.pending_visits,
        health = report.capacity_health,
        uncovered = report.uncovered_count,
        "coverage computed"
    );
    report
}
