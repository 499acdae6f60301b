//! Cluster profiling and labeling
//!
//! Maps raw k-means clusters onto the business profile taxonomy with a
//! greedy priority cascade. Each step removes its pick from the pool, so the
//! order of the steps decides which physical cluster gets which label.

use crate::features::{extract_features, FeatureVector, HOURS_PER_DAY};
use crate::kmeans;
use crate::models::EstablishmentRecord;
use serde::Serialize;
use tracing::info;

/// Low-performance clusters above this share of the top cluster's sales are
/// not meaningfully different from it.
pub const LOW_PERFORMANCE_RATIO: f64 = 0.8;
/// Minimum average duration (hours) to count as extended operation
pub const EXTENDED_MIN_HOURS: f64 = 10.5;
/// Average opening hour at or after which a cluster is not a morning profile
pub const MORNING_OPEN_CUTOFF: f64 = 8.5;

/// Human-facing profile labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProfileLabel {
    #[serde(rename = "High Performance")]
    HighPerformance,
    #[serde(rename = "Low Performance")]
    LowPerformance,
    #[serde(rename = "Standard Commerce")]
    StandardCommerce,
    #[serde(rename = "Extended Operation")]
    ExtendedOperation,
    #[serde(rename = "Average Performance")]
    AveragePerformance,
    #[serde(rename = "Premium Morning")]
    PremiumMorning,
    #[serde(rename = "Alternative Profile")]
    AlternativeProfile,
}

impl ProfileLabel {
    pub fn name(&self) -> &'static str {
        match self {
            ProfileLabel::HighPerformance => "High Performance",
            ProfileLabel::LowPerformance => "Low Performance",
            ProfileLabel::StandardCommerce => "Standard Commerce",
            ProfileLabel::ExtendedOperation => "Extended Operation",
            ProfileLabel::AveragePerformance => "Average Performance",
            ProfileLabel::PremiumMorning => "Premium Morning",
            ProfileLabel::AlternativeProfile => "Alternative Profile",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProfileLabel::HighPerformance => "Highest average sales in the portfolio; prioritize relationship visits",
            ProfileLabel::LowPerformance => "Lowest average sales; candidates for activation or recovery actions",
            ProfileLabel::StandardCommerce => "Sales close to the top group with a regular commercial routine",
            ProfileLabel::ExtendedOperation => "Open for long hours; flexible visit windows",
            ProfileLabel::AveragePerformance => "Typical sales and business hours",
            ProfileLabel::PremiumMorning => "Opens early; schedule visits in the first hours of the route",
            ProfileLabel::AlternativeProfile => "Mixed pattern that does not fit the other profiles",
        }
    }

    /// Display tag used by front ends
    pub fn color(&self) -> &'static str {
        match self {
            ProfileLabel::HighPerformance => "emerald",
            ProfileLabel::LowPerformance => "rose",
            ProfileLabel::StandardCommerce => "sky",
            ProfileLabel::ExtendedOperation => "violet",
            ProfileLabel::AveragePerformance => "slate",
            ProfileLabel::PremiumMorning => "amber",
            ProfileLabel::AlternativeProfile => "zinc",
        }
    }
}

impl std::fmt::Display for ProfileLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub label: ProfileLabel,
    pub description: String,
    pub color: String,
    pub avg_sales: f64,
    pub avg_open: f64,
    pub avg_close: f64,
    pub avg_duration: f64,
    /// Member record ids in input order
    pub members: Vec<String>,
}

/// Aggregates for one raw cluster, before labeling
#[derive(Debug, Clone)]
struct ClusterStats {
    cluster_id: usize,
    avg_sales: f64,
    avg_open: f64,
    avg_close: f64,
    duration: f64,
    members: Vec<usize>,
}

fn cluster_stats(features: &[FeatureVector], assignments: &[usize], k: usize) -> Vec<ClusterStats> {
    (0..k)
        .map(|cluster_id| {
            let members: Vec<usize> = assignments
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c == cluster_id)
                .map(|(i, _)| i)
                .collect();
            let n = members.len().max(1) as f64;
            let avg_sales = members.iter().map(|&i| features[i].sales).sum::<f64>() / n;
            let avg_open = members.iter().map(|&i| features[i].open).sum::<f64>() / n;
            let avg_close = members.iter().map(|&i| features[i].close).sum::<f64>() / n;
            let mut duration = avg_close - avg_open;
            if duration < 0.0 {
                duration += HOURS_PER_DAY;
            }
            ClusterStats {
                cluster_id,
                avg_sales,
                avg_open,
                avg_close,
                duration,
                members,
            }
        })
        .collect()
}

/// Removes and returns the pool entry with the best key; ties keep the earliest.
fn take_best<F>(pool: &mut Vec<ClusterStats>, better: F) -> Option<ClusterStats>
where
    F: Fn(&ClusterStats, &ClusterStats) -> bool,
{
    let mut best: Option<usize> = None;
    for i in 0..pool.len() {
        match best {
            Some(b) if !better(&pool[i], &pool[b]) => {}
            _ => best = Some(i),
        }
    }
    best.map(|i| pool.remove(i))
}

/// Label clusters from their assignments. Empty clusters are left out.
/// Output is sorted by average sales, highest first.
pub fn build_profiles(records: &[EstablishmentRecord], features: &[FeatureVector], assignments: &[usize]) -> Vec<ClusterProfile> {
    let k = assignments.iter().max().map(|m| m + 1).unwrap_or(0).max(kmeans::K);
    let mut pool: Vec<ClusterStats> = cluster_stats(features, assignments, k)
        .into_iter()
        .filter(|s| !s.members.is_empty())
        .collect();

    let mut labeled: Vec<(ClusterStats, ProfileLabel)> = Vec::with_capacity(pool.len());

    let Some(high) = take_best(&mut pool, |a, b| a.avg_sales > b.avg_sales) else {
        return Vec::new();
    };
    let high_sales = high.avg_sales;
    labeled.push((high, ProfileLabel::HighPerformance));

    if let Some(low) = take_best(&mut pool, |a, b| a.avg_sales < b.avg_sales) {
        let label = if low.avg_sales > high_sales * LOW_PERFORMANCE_RATIO {
            ProfileLabel::StandardCommerce
        } else {
            ProfileLabel::LowPerformance
        };
        labeled.push((low, label));
    }

    if let Some(extended) = take_best(&mut pool, |a, b| a.duration > b.duration) {
        let label = if extended.duration <= EXTENDED_MIN_HOURS {
            ProfileLabel::AveragePerformance
        } else {
            ProfileLabel::ExtendedOperation
        };
        labeled.push((extended, label));
    }

    if let Some(morning) = take_best(&mut pool, |_, _| false) {
        let label = if morning.avg_open >= MORNING_OPEN_CUTOFF {
            ProfileLabel::AlternativeProfile
        } else {
            ProfileLabel::PremiumMorning
        };
        labeled.push((morning, label));
    }

    let mut profiles: Vec<ClusterProfile> = labeled
        .into_iter()
        .map(|(stats, label)| ClusterProfile {
            cluster_id: stats.cluster_id,
            label,
            description: label.description().to_string(),
            color: label.color().to_string(),
            avg_sales: stats.avg_sales,
            avg_open: stats.avg_open,
            avg_close: stats.avg_close,
            avg_duration: stats.duration,
            members: stats.members.iter().map(|&i| records[i].id.clone()).collect(),
        })
        .collect();

    profiles.sort_by(|a, b| b.avg_sales.total_cmp(&a.avg_sales));
    profiles
}

/// Full segmentation run: features, k-means, labeling.
/// Fewer than four records produce no profiles.
pub fn segment(records: &[EstablishmentRecord]) -> Vec<ClusterProfile> {
    let features = extract_features(records);
    let Some(result) = kmeans::cluster(&features) else {
        info!(records = records.len(), "skipping segmentation, not enough establishments");
        return Vec::new();
    };
    let profiles = build_profiles(records, &features, &result.assignments);
    info!(
        records = records.len(),
        profiles = profiles.len(),
        iterations = result.iterations,
        "segmentation complete"
    );
    profiles
}
