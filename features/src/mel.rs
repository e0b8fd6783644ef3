//! Mel filter bank, log compression and cepstral transform.

use std::f64::consts::PI;

use crate::config::MelRange;

/// Floor substituted for non-positive energies before taking logs.
pub const ENERGY_FLOOR: f64 = f32::EPSILON as f64;

/// Converts frequency in Hz to mel scale.
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Warps a mel value back to Hz.
///
/// Uses the natural-log form of the warp, which is what the corpus models
/// were trained against, so it is not an exact inverse of [`hz_to_mel`].
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * ((mel / 1125.0).exp() - 1.0)
}

/// Triangular mel filters over a half spectrum.
#[derive(Debug, Clone)]
pub struct MelBank {
    bins: usize,
    // [banks][bins]
    weights: Vec<Vec<f64>>,
}

impl MelBank {
    /// Builds `banks` triangular filters over `bins` magnitude bins.
    ///
    /// Filter edges sit at `floor((nfft + 1) * hz / sample_rate)` for
    /// `banks + 2` points evenly spaced on the mel scale across `range`.
    /// Edges beyond `bins` simply produce empty filters.
    pub fn new(bins: usize, banks: usize, nfft: usize, sample_rate: usize, range: MelRange) -> Self {
        let (low, high) = range.bounds();
        let min_mel = hz_to_mel(low);
        let max_mel = hz_to_mel(high);
        let step = (max_mel - min_mel) / (banks + 1) as f64;

        let edges: Vec<f64> = (0..banks + 2)
            .map(|n| {
                let hz = mel_to_hz(min_mel + n as f64 * step);
                ((nfft + 1) as f64 * hz / sample_rate as f64).floor()
            })
            .collect();

        let mut weights = Vec::with_capacity(banks);
        for m in 1..=banks {
            let (left, center, right) = (edges[m - 1], edges[m], edges[m + 1]);
            let filter = (0..bins)
                .map(|k| {
                    let k = k as f64;
                    if k >= left && k <= center && center != left {
                        (k - left) / (center - left)
                    } else if k >= center && k <= right && right != center {
                        (right - k) / (right - center)
                    } else {
                        0.0
                    }
                })
                .collect();
            weights.push(filter);
        }

        Self { bins, weights }
    }

    pub fn banks(&self) -> usize {
        self.weights.len()
    }

    /// Applies every filter to a magnitude frame.
    ///
    /// Zero products contribute [`ENERGY_FLOOR`] so that a silent frame still
    /// yields a strictly positive energy per bank.
    pub fn apply(&self, mags: &[f64]) -> Vec<f64> {
        let n = self.bins.min(mags.len());
        self.weights
            .iter()
            .map(|filter| {
                mags[..n]
                    .iter()
                    .zip(filter)
                    .map(|(&m, &w)| {
                        let p = m * w;
                        if p == 0.0 { ENERGY_FLOOR } else { p }
                    })
                    .sum()
            })
            .collect()
    }
}

/// Replaces each value with `log10(max(v, ENERGY_FLOOR))`.
pub fn log_compress(values: &mut [f64]) {
    for v in values.iter_mut() {
        if *v <= 0.0 || v.is_nan() {
            *v = ENERGY_FLOOR;
        }
        *v = v.log10();
    }
}

/// Unnormalized DCT-II: `X[i] = Σ x[n] cos(π / N (n + 0.5) i)`.
pub fn dct(values: &[f64]) -> Vec<f64> {
    let width = values.len();
    (0..width)
        .map(|i| {
            values
                .iter()
                .enumerate()
                .map(|(n, &x)| x * (PI / width as f64 * (n as f64 + 0.5) * i as f64).cos())
                .sum()
        })
        .collect()
}
