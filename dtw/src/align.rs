use phonex_cluster::Codebook;
use phonex_features::{FeatureSequence, FeatureSet};
use tracing::debug;

use crate::config::DtwConfig;
use crate::error::DtwError;
use crate::mode::{AlignmentMode, Reference};

/// Band half-width for operands of `n` and `m` frames.
///
/// `floor(fraction · max(n, m))`, widened to `|n − m|` so the last cell is
/// always inside the band.
pub fn band_width(n: usize, m: usize, fraction: f64) -> usize {
    let w = (fraction * n.max(m) as f64).floor() as usize;
    w.max(n.abs_diff(m))
}

/// Aligns `query` against `reference` and returns the warping distance.
///
/// Each call computes every score it needs from scratch; composite modes
/// sum independently computed passes.
pub fn align(
    query: &FeatureSet,
    reference: Reference<'_>,
    mode: AlignmentMode,
    cfg: &DtwConfig,
) -> Result<f64, DtwError> {
    let fraction = cfg.clone().with_defaults().window_fraction;

    match (mode, reference) {
        (AlignmentMode::Quantized, Reference::Codebook(book)) => {
            quantized_distance(&query.mfcc, book, fraction)
        }
        (AlignmentMode::Quantized, r) | (_, r @ Reference::Codebook(_)) => {
            Err(DtwError::ModeMismatch {
                mode,
                reference: r.kind(),
            })
        }
        (AlignmentMode::Descriptor(kind), Reference::Prototype(proto)) => {
            let q = query
                .descriptors
                .as_ref()
                .ok_or(DtwError::MissingDescriptors { side: "query" })?;
            let p = proto
                .descriptors
                .as_ref()
                .ok_or(DtwError::MissingDescriptors { side: "reference" })?;
            scalar_distance(q.stream(kind), p.stream(kind), fraction)
        }
        (AlignmentMode::Raw, Reference::Prototype(proto)) => {
            sequence_distance(&query.mfcc, &proto.mfcc, fraction)
        }
        (AlignmentMode::Delta, Reference::Prototype(proto)) => {
            let base = sequence_distance(&query.mfcc, &proto.mfcc, fraction)?;
            let d = sequence_distance(&*query.delta_stream()?, &*proto.delta_stream()?, fraction)?;
            Ok(base + d)
        }
        (AlignmentMode::DeltaDelta, Reference::Prototype(proto)) => {
            let base = sequence_distance(&query.mfcc, &proto.mfcc, fraction)?;
            let d = sequence_distance(&*query.delta_stream()?, &*proto.delta_stream()?, fraction)?;
            let dd = sequence_distance(
                &*query.delta_delta_stream()?,
                &*proto.delta_delta_stream()?,
                fraction,
            )?;
            Ok(base + d + dd)
        }
    }
}

/// Warping distance between two coefficient sequences; the local cost is
/// the sum of absolute per-coefficient differences of a frame pair.
pub fn sequence_distance(
    a: &FeatureSequence,
    b: &FeatureSequence,
    fraction: f64,
) -> Result<f64, DtwError> {
    if a.is_empty() {
        return Err(DtwError::EmptySequence { side: "query" });
    }
    if b.is_empty() {
        return Err(DtwError::EmptySequence { side: "reference" });
    }
    if a.coefficients() != b.coefficients() {
        return Err(DtwError::CoefficientMismatch {
            query: a.coefficients(),
            reference: b.coefficients(),
        });
    }
    banded(a.frames(), b.frames(), fraction, |i, j| {
        a.frame(i)
            .iter()
            .zip(b.frame(j))
            .map(|(&x, &y)| (x as f64 - y as f64).abs())
            .sum()
    })
}

/// Warping distance between two scalar streams.
pub fn scalar_distance(a: &[f32], b: &[f32], fraction: f64) -> Result<f64, DtwError> {
    if a.is_empty() {
        return Err(DtwError::EmptySequence { side: "query" });
    }
    if b.is_empty() {
        return Err(DtwError::EmptySequence { side: "reference" });
    }
    banded(a.len(), b.len(), fraction, |i, j| (a[i] as f64 - b[j] as f64).abs())
}

/// Quantization distance of `a` against a codebook.
///
/// A frame's cost is the sum over its coefficients of the squared distance
/// to the column's nearest centroid. The band runs over the query against
/// itself, so the cost of a cell depends only on its row.
pub fn quantized_distance(a: &FeatureSequence, book: &Codebook, fraction: f64) -> Result<f64, DtwError> {
    if a.is_empty() {
        return Err(DtwError::EmptySequence { side: "query" });
    }
    if book.columns.is_empty() {
        return Err(DtwError::EmptySequence { side: "reference" });
    }
    if a.coefficients() != book.coefficients() {
        return Err(DtwError::CoefficientMismatch {
            query: a.coefficients(),
            reference: book.coefficients(),
        });
    }

    let mut row_cost = Vec::with_capacity(a.frames());
    for frame in a.iter_frames() {
        let mut cost = 0.0f64;
        for (m, &v) in frame.iter().enumerate() {
            let (_, d) = book.nearest(m, v)?;
            cost += (d as f64).powi(2);
        }
        row_cost.push(cost);
    }

    let n = a.frames();
    banded(n, n, fraction, |i, _| row_cost[i])
}

/// Fills an `(n + 1) × (m + 1)` cost matrix whose border is infinite except
/// the origin, visiting only cells with `|i − j| ≤ band_width(n, m)`, and
/// returns the last cell.
fn banded<F>(n: usize, m: usize, fraction: f64, local: F) -> Result<f64, DtwError>
where
    F: Fn(usize, usize) -> f64,
{
    let w = band_width(n, m, fraction);
    let (rows, cols) = (n + 1, m + 1);
    let cells = rows
        .checked_mul(cols)
        .ok_or(DtwError::Allocation { rows, cols })?;

    let mut matrix: Vec<f64> = Vec::new();
    matrix
        .try_reserve_exact(cells)
        .map_err(|_| DtwError::Allocation { rows, cols })?;
    matrix.resize(cells, f64::INFINITY);
    matrix[0] = 0.0;

    for i in 1..rows {
        let lo = i.saturating_sub(w).max(1);
        let hi = (i + w).min(m);
        for j in lo..=hi {
            let best = matrix[(i - 1) * cols + j]
                .min(matrix[i * cols + j - 1])
                .min(matrix[(i - 1) * cols + j - 1]);
            matrix[i * cols + j] = local(i - 1, j - 1) + best;
        }
    }

    let score = matrix[cells - 1];
    if !score.is_finite() {
        debug!(rows = n, cols = m, band = w, "no finite warping path");
        return Err(DtwError::Unreachable { rows: n, cols: m });
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phonex_cluster::Cluster;
    use phonex_features::{DescriptorKind, Descriptors};

    fn seq(coefficients: usize, values: &[f32]) -> FeatureSequence {
        FeatureSequence::new(coefficients, values.to_vec()).unwrap()
    }

    fn set(coefficients: usize, values: &[f32]) -> FeatureSet {
        FeatureSet::new(seq(coefficients, values))
    }

    fn codebook(columns: &[&[f32]]) -> Codebook {
        Codebook {
            columns: columns
                .iter()
                .map(|c| Cluster {
                    centroids: c.to_vec(),
                    partitions: vec![Vec::new(); c.len()],
                    gvf: 1.0,
                    threshold: 0.8,
                    tries: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn band_width_widens_to_length_gap() {
        assert_eq!(band_width(10, 10, 0.2), 2);
        assert_eq!(band_width(10, 20, 0.2), 10);
        assert_eq!(band_width(4, 4, 0.0), 0);
        assert_eq!(band_width(7, 3, 0.1), 4);
    }

    #[test]
    fn self_distance_is_zero() {
        let a = set(2, &[0.1, 0.5, 0.3, -0.2, 0.9, 0.0, 0.4, 0.4]);
        let cfg = DtwConfig::default();
        for mode in [AlignmentMode::Raw, AlignmentMode::Delta, AlignmentMode::DeltaDelta] {
            let d = align(&a, Reference::Prototype(&a), mode, &cfg).unwrap();
            assert_eq!(d, 0.0, "mode {mode:?}");
        }
    }

    #[test]
    fn equal_length_is_symmetric() {
        let a = set(2, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let b = set(2, &[0.5, 1.0, 1.5, 3.5, 4.0, 4.0, 7.0, 7.5]);
        let cfg = DtwConfig::default();
        let ab = align(&a, (&b).into(), AlignmentMode::Raw, &cfg).unwrap();
        let ba = align(&b, (&a).into(), AlignmentMode::Raw, &cfg).unwrap();
        assert!(ab > 0.0);
        assert_eq!(ab, ba);
    }

    #[test]
    fn diagonal_band_sums_frame_costs() {
        let a = seq(1, &[1.0, 2.0, 3.0]);
        let b = seq(1, &[1.0, 2.5, 2.0]);
        // Zero band keeps the path on the diagonal: 0 + 0.5 + 1.0.
        assert_eq!(sequence_distance(&a, &b, 0.0).unwrap(), 1.5);
    }

    #[test]
    fn warping_absorbs_repeated_frames() {
        let a = seq(1, &[1.0, 2.0, 3.0]);
        let b = seq(1, &[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(sequence_distance(&a, &b, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn different_lengths_stay_reachable() {
        let a = seq(1, &[1.0]);
        let b = seq(1, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(sequence_distance(&a, &b, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn coefficient_mismatch_is_fatal() {
        let a = seq(2, &[1.0, 2.0]);
        let b = seq(1, &[1.0, 2.0]);
        let err = sequence_distance(&a, &b, 0.2).unwrap_err();
        assert!(matches!(err, DtwError::CoefficientMismatch { query: 2, reference: 1 }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn empty_stream_is_recoverable() {
        let err = scalar_distance(&[], &[1.0], 0.2).unwrap_err();
        assert!(matches!(err, DtwError::EmptySequence { side: "query" }));
        assert!(err.is_recoverable());
        let err = scalar_distance(&[1.0], &[], 0.2).unwrap_err();
        assert!(matches!(err, DtwError::EmptySequence { side: "reference" }));
    }

    #[test]
    fn quantized_exact_centroids_cost_nothing() {
        let q = set(2, &[1.0, 5.0, 2.0, 6.0, 1.0, 6.0]);
        let book = codebook(&[&[1.0, 2.0], &[5.0, 6.0]]);
        let d = align(&q, Reference::Codebook(&book), AlignmentMode::Quantized, &DtwConfig::default())
            .unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn quantized_sums_squared_errors() {
        let q = set(1, &[1.5, 3.0]);
        let book = codebook(&[&[1.0, 4.0]]);
        // 0.5² + 1² along the diagonal.
        let d = quantized_distance(&q.mfcc, &book, 0.0).unwrap();
        assert!((d - 1.25).abs() < 1e-9, "distance {d}");
    }

    #[test]
    fn descriptor_mode_uses_one_stream() {
        let mut a = set(1, &[0.0, 0.0]);
        let mut b = set(1, &[9.0, 9.0]);
        a.descriptors = Some(Descriptors {
            zero_cross: vec![0.1, 0.2],
            energy: vec![1.0, 2.0],
            kurtosis: vec![0.0, 0.0],
            entropy: vec![0.0, 0.0],
        });
        b.descriptors = Some(Descriptors {
            zero_cross: vec![0.1, 0.2],
            energy: vec![1.0, 4.0],
            kurtosis: vec![0.0, 0.0],
            entropy: vec![0.0, 0.0],
        });
        let cfg = DtwConfig {
            window_fraction: 0.0,
        };
        let zc = align(&a, (&b).into(), AlignmentMode::Descriptor(DescriptorKind::ZeroCross), &cfg)
            .unwrap();
        assert_eq!(zc, 0.0);
        let ste = align(&a, (&b).into(), AlignmentMode::Descriptor(DescriptorKind::Energy), &cfg)
            .unwrap();
        assert_eq!(ste, 2.0);
    }

    #[test]
    fn descriptor_mode_requires_streams() {
        let a = set(1, &[0.0]);
        let err = align(
            &a,
            (&a).into(),
            AlignmentMode::Descriptor(DescriptorKind::Kurtosis),
            &DtwConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DtwError::MissingDescriptors { side: "query" }));
    }

    #[test]
    fn mode_and_reference_must_agree() {
        let a = set(1, &[0.0, 1.0]);
        let book = codebook(&[&[0.0]]);
        let cfg = DtwConfig::default();
        assert!(matches!(
            align(&a, (&a).into(), AlignmentMode::Quantized, &cfg),
            Err(DtwError::ModeMismatch { reference: "prototype", .. })
        ));
        assert!(matches!(
            align(&a, (&book).into(), AlignmentMode::Raw, &cfg),
            Err(DtwError::ModeMismatch { reference: "codebook", .. })
        ));
    }

    #[test]
    fn delta_mode_adds_derivative_score() {
        let a = set(1, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        let b = set(1, &[0.0, 2.0, 4.0, 6.0, 8.0]);
        let cfg = DtwConfig {
            window_fraction: 0.0,
        };
        let raw = align(&a, (&b).into(), AlignmentMode::Raw, &cfg).unwrap();
        let delta = align(&a, (&b).into(), AlignmentMode::Delta, &cfg).unwrap();
        assert!(delta > raw, "delta {delta} should exceed raw {raw}");
    }
}
