use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SearchConfig;
use crate::error::ClusterError;
use crate::registry::{Bounds, SearchRegistry, Step, Token, Watchdog};

/// Natural-breaks clustering of one coefficient column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique centroids in ascending order. Never empty.
    pub centroids: Vec<f32>,

    /// Values assigned to each centroid, parallel to `centroids`.
    pub partitions: Vec<Vec<f32>>,

    /// Goodness of variance fit of the accepted candidate, in `[0, 1]`.
    pub gvf: f64,

    /// Threshold in force when the candidate was accepted.
    pub threshold: f64,

    /// Candidates evaluated before acceptance.
    pub tries: u32,
}

impl Cluster {
    /// Returns the centroid nearest to `value` and its absolute distance.
    ///
    /// Stops at the first exact match; ties go to the lower centroid.
    pub fn nearest(&self, value: f32) -> (f32, f32) {
        let mut best = (self.centroids[0], (self.centroids[0] - value).abs());
        for &c in &self.centroids {
            let d = (c - value).abs();
            if d == 0.0 {
                return (c, 0.0);
            }
            if d < best.1 {
                best = (c, d);
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// Searches for a natural-breaks clustering of `values`.
///
/// The search starts at `min_hint²` clusters (capped by the number of
/// distinct values) and walks down, relaxing its acceptance threshold each
/// time it reaches `min_hint` without a good enough fit. Progress lives in
/// `registry` under `token`; a [`Watchdog`] reports it while the search
/// runs and is cancelled when a candidate is accepted.
pub fn build_cluster(
    values: &[f32],
    min_hint: usize,
    token: Token,
    registry: &Arc<SearchRegistry>,
    cfg: &SearchConfig,
) -> Result<Cluster, ClusterError> {
    if values.is_empty() {
        return Err(ClusterError::Empty);
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ClusterError::NonFinite { index });
    }
    let cfg = cfg.clone().with_defaults();

    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    let floor = min_hint.max(1);
    let start = (floor * floor).max(2).min(distinct.len()).max(1);
    let bounds = Bounds {
        floor: floor.min(start),
        restart: start.saturating_sub(1).max(1),
    };

    registry.begin(token, cfg.initial_threshold, start)?;
    let mut watchdog = Watchdog::spawn(token, Arc::clone(registry), cfg.watchdog_interval());

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ token),
        None => StdRng::from_entropy(),
    };
    let gaps = distinct.len().saturating_sub(1);
    let mut k = start;
    let mut offset = 0;

    loop {
        let candidate = evaluate(&sorted, &distinct, k, offset);
        match registry.record(token, candidate.gvf, bounds, &cfg) {
            Step::Accept { threshold } => {
                watchdog.cancel();
                let tries = registry.snapshot(token).map_or(0, |s| s.tries);
                info!(
                    token,
                    tries,
                    clusters = candidate.centroids.len(),
                    gvf = candidate.gvf,
                    threshold,
                    "clustering accepted"
                );
                return Ok(Cluster {
                    centroids: candidate.centroids,
                    partitions: candidate.partitions,
                    gvf: candidate.gvf,
                    threshold,
                    tries,
                });
            }
            Step::Retry { k: next } => k = next,
        }
        if gaps > 0 {
            offset = rng.gen_range(0..gaps);
        }
    }
}

pub(crate) struct Candidate {
    pub centroids: Vec<f32>,
    pub partitions: Vec<Vec<f32>>,
    pub gvf: f64,
}

/// Builds and scores the `k`-cluster candidate.
///
/// `sorted` holds every value in ascending order and `distinct` the same
/// values deduplicated. Breaks are placed at the `k - 1` largest relative
/// gaps of `distinct` at or after `offset`; each run between breaks
/// contributes the midpoint of its extremes as a centroid.
pub(crate) fn evaluate(sorted: &[f32], distinct: &[f32], k: usize, offset: usize) -> Candidate {
    let cuts = breakpoints(distinct, k.saturating_sub(1), offset);

    let mut centroids = Vec::with_capacity(cuts.len() + 1);
    let mut lo = 0;
    for &cut in cuts.iter().chain(std::iter::once(&(distinct.len() - 1))) {
        centroids.push((distinct[lo] + distinct[cut]) / 2.0);
        lo = cut + 1;
    }
    centroids.sort_by(f32::total_cmp);
    centroids.dedup();
    let nonzero: Vec<f32> = centroids.iter().copied().filter(|&c| c != 0.0).collect();
    let centroids = if nonzero.is_empty() { vec![0.0] } else { nonzero };

    let mut partitions = vec![Vec::new(); centroids.len()];
    for &v in sorted {
        partitions[nearest_index(&centroids, v)].push(v);
    }

    let gvf = gvf(sorted, &partitions);
    Candidate {
        centroids,
        partitions,
        gvf,
    }
}

/// Indices `i` of `distinct` after which a break falls, ascending.
///
/// Gaps are measured as the percentage change `100 · (d[i+1] − d[i]) / |d[i]|`;
/// a gap starting at zero counts as 0 and is never picked.
pub(crate) fn breakpoints(distinct: &[f32], count: usize, offset: usize) -> Vec<usize> {
    let mut gaps: Vec<(usize, f64)> = distinct
        .windows(2)
        .enumerate()
        .skip(offset)
        .filter_map(|(i, w)| {
            let base = w[0].abs() as f64;
            if base == 0.0 {
                return None;
            }
            let change = 100.0 * (w[1] as f64 - w[0] as f64) / base;
            (change > 0.0).then_some((i, change))
        })
        .collect();
    // Largest first; earlier gap wins a tie.
    gaps.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut cuts: Vec<usize> = gaps.into_iter().take(count).map(|(i, _)| i).collect();
    cuts.sort_unstable();
    cuts
}

fn nearest_index(centroids: &[f32], v: f32) -> usize {
    let mut best = 0;
    let mut best_d = f32::MAX;
    for (i, &c) in centroids.iter().enumerate() {
        let d = (c - v).abs();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// Sum of squared deviations from the mean; 0 for an empty slice.
pub(crate) fn squared_deviations(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
    values.iter().map(|&v| (v as f64 - mean).powi(2)).sum()
}

/// Goodness of variance fit, `(SDAM − ΣSDCM) / SDAM`, clamped to `[0, 1]`.
///
/// Data without variance fits perfectly.
pub(crate) fn gvf(values: &[f32], partitions: &[Vec<f32>]) -> f64 {
    let sdam = squared_deviations(values);
    if sdam == 0.0 {
        return 1.0;
    }
    let sdcm: f64 = partitions.iter().map(|p| squared_deviations(p)).sum();
    ((sdam - sdcm) / sdam).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<SearchRegistry> {
        Arc::new(SearchRegistry::new())
    }

    fn seeded() -> SearchConfig {
        SearchConfig {
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn bimodal_converges_to_two_clusters() {
        let mut values = vec![1.0f32; 50];
        values.extend(std::iter::repeat(9.0).take(50));
        let reg = registry();

        let cluster = build_cluster(&values, 2, 1, &reg, &seeded()).unwrap();
        assert_eq!(cluster.centroids, vec![1.0, 9.0]);
        assert_eq!(cluster.partitions[0].len(), 50);
        assert_eq!(cluster.partitions[1].len(), 50);
        assert!(cluster.gvf >= 0.8, "gvf {}", cluster.gvf);
        assert_eq!(cluster.tries, 1);
        assert!(reg.snapshot(1).unwrap().accepted);
    }

    #[test]
    fn jittered_bimodal_lands_in_both_modes() {
        let mut values: Vec<f32> = (0..50).map(|i| 1.0 + i as f32 * 0.001).collect();
        values.extend((0..50).map(|i| 10.0 + i as f32 * 0.001));
        let reg = registry();

        let cluster = build_cluster(&values, 2, 2, &reg, &seeded()).unwrap();
        assert!(cluster.gvf >= 0.8, "gvf {}", cluster.gvf);
        assert!(cluster.tries < 50, "took {} tries", cluster.tries);
        assert!(cluster.centroids.iter().any(|&c| c < 2.0), "{:?}", cluster.centroids);
        assert!(cluster.centroids.iter().any(|&c| c > 9.0), "{:?}", cluster.centroids);
        let assigned: usize = cluster.partitions.iter().map(Vec::len).sum();
        assert_eq!(assigned, 100);
    }

    #[test]
    fn all_equal_values_take_one_try() {
        let reg = registry();
        let cluster = build_cluster(&[3.5; 20], 3, 7, &reg, &seeded()).unwrap();
        assert_eq!(cluster.centroids, vec![3.5]);
        assert_eq!(cluster.tries, 1);
        assert_eq!(cluster.gvf, 1.0);
    }

    #[test]
    fn all_zero_values_keep_one_centroid() {
        let reg = registry();
        let cluster = build_cluster(&[0.0; 8], 2, 8, &reg, &seeded()).unwrap();
        assert_eq!(cluster.centroids, vec![0.0]);
        assert_eq!(cluster.partitions[0].len(), 8);
    }

    #[test]
    fn rejects_bad_input() {
        let reg = registry();
        assert!(matches!(
            build_cluster(&[], 2, 1, &reg, &seeded()),
            Err(ClusterError::Empty)
        ));
        assert!(matches!(
            build_cluster(&[1.0, f32::NAN], 2, 1, &reg, &seeded()),
            Err(ClusterError::NonFinite { index: 1 })
        ));
    }

    #[test]
    fn spread_data_terminates() {
        let values: Vec<f32> = (1..=200).map(|i| (i as f32).sqrt()).collect();
        let reg = registry();
        let cluster = build_cluster(&values, 3, 4, &reg, &seeded()).unwrap();
        assert!((0.0..=1.0).contains(&cluster.gvf));
        assert!(!cluster.centroids.is_empty());
        let mut sorted = cluster.centroids.clone();
        sorted.dedup();
        assert_eq!(sorted, cluster.centroids, "centroids must be unique");
    }

    #[test]
    fn breakpoints_pick_largest_relative_gaps() {
        let distinct = [1.0, 1.1, 5.0, 5.2, 20.0];
        assert_eq!(breakpoints(&distinct, 2, 0), vec![1, 3]);
        // Offset skips the first two gaps.
        assert_eq!(breakpoints(&distinct, 1, 2), vec![3]);
        // Gaps starting at zero never count.
        assert!(breakpoints(&[0.0, 4.0], 1, 0).is_empty());
    }

    #[test]
    fn gvf_bounds() {
        let values = [1.0, 1.0, 5.0, 5.0];
        assert_eq!(gvf(&values, &[vec![1.0, 1.0], vec![5.0, 5.0]]), 1.0);
        assert_eq!(gvf(&values, &[values.to_vec()]), 0.0);
        assert_eq!(gvf(&[2.0, 2.0], &[vec![2.0, 2.0]]), 1.0);
    }

    #[test]
    fn nearest_exits_on_exact_match() {
        let cluster = Cluster {
            centroids: vec![-1.0, 2.0, 6.0],
            partitions: vec![Vec::new(); 3],
            gvf: 1.0,
            threshold: 0.8,
            tries: 1,
        };
        assert_eq!(cluster.nearest(2.0), (2.0, 0.0));
        assert_eq!(cluster.nearest(3.0), (2.0, 1.0));
        assert_eq!(cluster.nearest(-5.0), (-1.0, 4.0));
    }
}
