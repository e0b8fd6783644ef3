//! Temporal derivative streams.

use crate::error::FeatureError;
use crate::sequence::FeatureSequence;

/// Frames looked ahead of and behind the current frame.
const SPAN: usize = 2;

/// Computes the ±2-frame symmetric difference of every coefficient.
///
/// The span shrinks at either end of the sequence, so the first frame is
/// `x[2] - x[0]` and the last is `x[n-1] - x[n-3]`. Any non-finite result
/// is reported as [`FeatureError::NonFinite`] and no stream is returned.
pub fn delta(seq: &FeatureSequence) -> Result<FeatureSequence, FeatureError> {
    let frames = seq.frames();
    let c = seq.coefficients();
    let src = seq.values();

    let mut out = Vec::new();
    out.try_reserve_exact(src.len())
        .map_err(|_| FeatureError::Allocation { requested: src.len() })?;

    for i in 0..frames {
        let ahead = (frames - 1 - i).min(SPAN);
        let behind = i.min(SPAN);
        for m in 0..c {
            let v = src[(i + ahead) * c + m] - src[(i - behind) * c + m];
            if !v.is_finite() {
                return Err(FeatureError::NonFinite {
                    stage: "delta",
                    index: i * c + m,
                });
            }
            out.push(v);
        }
    }
    FeatureSequence::new(c, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_span_at_edges() {
        let seq = FeatureSequence::new(1, vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let d = delta(&seq).unwrap();
        assert_eq!(d.values(), &[2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn keeps_coefficients_independent() {
        let seq = FeatureSequence::new(2, vec![1.0, 10.0, 2.0, 20.0, 4.0, 40.0]).unwrap();
        let d = delta(&seq).unwrap();
        assert_eq!(d.coefficients(), 2);
        assert_eq!(d.frame(0), &[3.0, 30.0]);
        assert_eq!(d.frame(2), &[3.0, 30.0]);
    }

    #[test]
    fn single_frame_is_zero() {
        let seq = FeatureSequence::new(3, vec![5.0, -1.0, 2.0]).unwrap();
        let d = delta(&seq).unwrap();
        assert_eq!(d.values(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn non_finite_input_is_fatal() {
        let seq = FeatureSequence::new(1, vec![f32::INFINITY, 1.0, 2.0]).unwrap();
        let err = delta(&seq).unwrap_err();
        assert!(matches!(err, FeatureError::NonFinite { stage: "delta", .. }));
        assert!(!err.is_recoverable());
    }
}
