//! Per-window time-domain descriptors used by the coarse classifier.

use serde::{Deserialize, Serialize};

/// Selects one descriptor stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    #[default]
    ZeroCross,
    Energy,
    Kurtosis,
    Entropy,
}

/// Four scalar streams, one value per non-overlapping window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptors {
    pub zero_cross: Vec<f32>,
    pub energy: Vec<f32>,
    pub kurtosis: Vec<f32>,
    pub entropy: Vec<f32>,
}

impl Descriptors {
    /// Computes all four descriptors over consecutive `width`-sample windows.
    /// A trailing partial window is ignored.
    pub fn compute(signal: &[f32], width: usize) -> Self {
        let mut out = Self::default();
        if width == 0 {
            return out;
        }
        for chunk in signal.chunks_exact(width) {
            out.zero_cross.push(zero_cross_rate(chunk));
            out.energy.push(short_time_energy(chunk));
            out.kurtosis.push(kurtosis(chunk));
            out.entropy.push(log_entropy(chunk));
        }
        out
    }

    pub fn stream(&self, kind: DescriptorKind) -> &[f32] {
        match kind {
            DescriptorKind::ZeroCross => &self.zero_cross,
            DescriptorKind::Energy => &self.energy,
            DescriptorKind::Kurtosis => &self.kurtosis,
            DescriptorKind::Entropy => &self.entropy,
        }
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.zero_cross.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zero_cross.is_empty()
    }
}

/// Counts sign changes, where zero counts as non-positive.
pub fn zero_cross_rate(chunk: &[f32]) -> f32 {
    chunk
        .windows(2)
        .filter(|w| (w[0] > 0.0) != (w[1] > 0.0))
        .count() as f32
}

/// Sum of squared samples.
pub fn short_time_energy(chunk: &[f32]) -> f32 {
    chunk.iter().map(|&x| x as f64 * x as f64).sum::<f64>() as f32
}

/// `(N Σd⁴) / (N Σd²)²` with `N = 1/len`; 0 for flat windows.
pub fn kurtosis(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    let n = 1.0 / chunk.len() as f64;
    let mean = chunk.iter().map(|&x| x as f64).sum::<f64>() * n;
    let (mut top, mut bot) = (0.0f64, 0.0f64);
    for &x in chunk {
        let d = x as f64 - mean;
        // Deviations within float noise of the mean carry no shape.
        if d.abs() <= f32::EPSILON as f64 {
            continue;
        }
        top += d.powi(4);
        bot += d * d;
    }
    if bot == 0.0 {
        return 0.0;
    }
    ((n * top) / (n * bot).powi(2)) as f32
}

/// `ln |Σ |x| log2 |x||`, treating zero samples as 1; 0 when the sum vanishes.
pub fn log_entropy(chunk: &[f32]) -> f32 {
    let entropy: f64 = chunk
        .iter()
        .map(|&x| {
            let a = if x == 0.0 { 1.0 } else { (x as f64).abs() };
            a * a.log2()
        })
        .sum();
    if entropy == 0.0 {
        return 0.0;
    }
    entropy.abs().ln() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cross_counts_sign_changes() {
        assert_eq!(zero_cross_rate(&[1.0, -1.0, 1.0, -1.0]), 3.0);
        assert_eq!(zero_cross_rate(&[0.0, 0.0, -1.0]), 0.0);
        assert_eq!(zero_cross_rate(&[0.0, 2.0]), 1.0);
    }

    #[test]
    fn energy_is_sum_of_squares() {
        assert_eq!(short_time_energy(&[1.0, -2.0, 3.0]), 14.0);
    }

    #[test]
    fn kurtosis_of_flat_window_is_zero() {
        assert_eq!(kurtosis(&[3.0; 16]), 0.0);
        assert_eq!(kurtosis(&[]), 0.0);
    }

    #[test]
    fn kurtosis_of_symmetric_pair() {
        // d = ±1 everywhere: N·Σd⁴ = 1, (N·Σd²)² = 1.
        let k = kurtosis(&[1.0, -1.0, 1.0, -1.0]);
        assert!((k - 1.0).abs() < 1e-6, "got {k}");
    }

    #[test]
    fn entropy_of_silence_is_zero() {
        assert_eq!(log_entropy(&[0.0; 32]), 0.0);
        assert!(log_entropy(&[4.0, 0.5, -2.0]).is_finite());
    }

    #[test]
    fn compute_splits_into_windows() {
        let signal: Vec<f32> = (0..300).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let d = Descriptors::compute(&signal, 128);
        assert_eq!(d.len(), 2);
        assert_eq!(d.stream(DescriptorKind::ZeroCross), &[127.0, 127.0]);
        assert_eq!(d.stream(DescriptorKind::Energy), &[128.0, 128.0]);
        assert_eq!(d.kurtosis.len(), 2);
        assert_eq!(d.entropy.len(), 2);
    }
}
