//! K-means over normalized (sales, open, close) points.
//!
//! Seeding is deterministic: the four seeds are picked by sorting the batch
//! (highest sales, lowest sales, longest duration, earliest open). Ties in
//! distance go to the lowest centroid index, so results depend on centroid
//! order.

use crate::features::FeatureVector;
use tracing::debug;

/// Number of segments for establishment profiling
pub const K: usize = 4;
pub const MAX_ITERATIONS: usize = 20;

pub type Point = [f64; 3];

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index (0..k) for every input point, in input order
    pub assignments: Vec<usize>,
    pub centroids: Vec<Point>,
    pub iterations: usize,
}

fn distance(a: &Point, b: &Point) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn nearest(point: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance(point, c);
        // strict comparison keeps the earliest centroid on ties
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Indices of the domain seeds: highest sales, lowest sales, longest
/// duration, earliest open. All sorts are stable.
pub fn seed_indices(features: &[FeatureVector]) -> Vec<usize> {
    if features.is_empty() {
        return Vec::new();
    }

    let mut by_sales: Vec<usize> = (0..features.len()).collect();
    by_sales.sort_by(|&a, &b| features[b].normalized[0].total_cmp(&features[a].normalized[0]));

    let mut by_duration: Vec<usize> = (0..features.len()).collect();
    by_duration.sort_by(|&a, &b| features[b].duration.total_cmp(&features[a].duration));

    let mut by_open: Vec<usize> = (0..features.len()).collect();
    by_open.sort_by(|&a, &b| features[a].normalized[1].total_cmp(&features[b].normalized[1]));

    let candidates = [
        by_sales[0],
        by_sales[by_sales.len() - 1],
        by_duration[0],
        by_open[0],
    ];

    let mut seeds = Vec::with_capacity(K);
    for idx in candidates {
        if !seeds.contains(&idx) {
            seeds.push(idx);
        }
    }

    if seeds.len() < K {
        debug!(distinct = seeds.len(), "degenerate seeding, using first {} records", K);
        return (0..K.min(features.len())).collect();
    }
    seeds
}

/// Lloyd's algorithm from the given starting centroids.
///
/// A centroid left without points keeps its previous position. Stops when no
/// assignment changes or after `max_iterations`.
pub fn lloyd(points: &[Point], initial: Vec<Point>, max_iterations: usize) -> KMeansResult {
    let mut centroids = initial;
    let mut assignments: Vec<Option<usize>> = vec![None; points.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let cluster = nearest(p, &centroids);
            if assignments[i] != Some(cluster) {
                assignments[i] = Some(cluster);
                changed = true;
            }
        }

        if !changed {
            break;
        }

        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Point> = points
                .iter()
                .zip(assignments.iter())
                .filter(|(_, a)| **a == Some(c))
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }
            let n = members.len() as f64;
            let mut mean = [0.0; 3];
            for p in &members {
                for d in 0..3 {
                    mean[d] += p[d];
                }
            }
            for value in mean.iter_mut() {
                *value /= n;
            }
            *centroid = mean;
        }
    }

    KMeansResult {
        assignments: assignments.into_iter().map(|a| a.unwrap_or(0)).collect(),
        centroids,
        iterations,
    }
}

/// Cluster a batch into `K` groups. Returns `None` when there are fewer
/// points than clusters.
pub fn cluster(features: &[FeatureVector]) -> Option<KMeansResult> {
    if features.len() < K {
        debug!(points = features.len(), "not enough points to cluster");
        return None;
    }

    let points: Vec<Point> = features.iter().map(|f| f.normalized).collect();
    let initial: Vec<Point> = seed_indices(features).into_iter().map(|i| points[i]).collect();
    let result = lloyd(&points, initial, MAX_ITERATIONS);
    debug!(points = points.len(), iterations = result.iterations, "k-means finished");
    Some(result)
}
