use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Frequency span covered by the mel filter bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MelRange {
    /// 0–4000 Hz.
    #[default]
    Narrow,
    /// 0–8000 Hz.
    Wide,
}

impl MelRange {
    /// Returns `(low_hz, high_hz)`.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::Narrow => (0.0, 4000.0),
            Self::Wide => (0.0, 8000.0),
        }
    }
}

/// Configures MFCC sequence extraction.
///
/// Defaults follow the phoneme corpus setup: 128-sample windows with 50%
/// overlap, 40 mel banks and 8 kept cepstral coefficients per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Analysis window width in samples; must be a power of two (default: 128).
    pub window_width: usize,
    /// Number of triangular mel filters (default: 40).
    pub banks: usize,
    /// Cepstral coefficients kept per frame (default: 8).
    pub coefficients: usize,
    /// Frame stride is `window_width / interval_div` (default: 2).
    pub interval_div: usize,
    /// Piecewise aggregation factor (default: 2).
    pub paa: usize,
    /// Decimate the signal with `paa` before framing (default: false).
    pub paa_enabled: bool,
    /// Upper bound on frames per sequence; `None` means unlimited.
    pub frame_limit: Option<usize>,
    /// FFT size used to place mel bank edges (default: 512).
    pub nfft: usize,
    /// Input sample rate in Hz (default: 16000).
    pub sample_rate: usize,
    /// Mel bank frequency span (default: narrow, 0–4000 Hz).
    pub mel_range: MelRange,
    /// Derive the delta stream (default: false).
    pub delta: bool,
    /// Derive the delta-delta stream; implies `delta` (default: false).
    pub delta_delta: bool,
    /// Compute per-window descriptors (default: false).
    pub descriptors: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_width: 128,
            banks: 40,
            coefficients: 8,
            interval_div: 2,
            paa: 2,
            paa_enabled: false,
            frame_limit: None,
            nfft: 512,
            sample_rate: 16000,
            mel_range: MelRange::Narrow,
            delta: false,
            delta_delta: false,
            descriptors: false,
        }
    }
}

impl FeatureConfig {
    /// Parses a config from JSON bytes. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Parses a config from YAML bytes. Missing fields take their defaults.
    pub fn from_yaml(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(data)
    }

    /// Replaces zero values with defaults and checks the remaining invariants.
    pub(crate) fn with_defaults(mut self) -> Result<Self, FeatureError> {
        let def = Self::default();
        if self.window_width == 0 {
            self.window_width = def.window_width;
        }
        if self.banks == 0 {
            self.banks = def.banks;
        }
        if self.coefficients == 0 {
            self.coefficients = def.coefficients;
        }
        if self.interval_div == 0 {
            self.interval_div = def.interval_div;
        }
        if self.paa == 0 {
            self.paa = 1;
        }
        if self.nfft == 0 {
            self.nfft = def.nfft;
        }
        if self.sample_rate == 0 {
            self.sample_rate = def.sample_rate;
        }
        if self.delta_delta {
            self.delta = true;
        }

        if !self.window_width.is_power_of_two() || self.window_width < 2 {
            return Err(FeatureError::InvalidConfig(format!(
                "window_width must be a power of two >= 2, got {}",
                self.window_width
            )));
        }
        if self.coefficients > self.banks {
            return Err(FeatureError::InvalidConfig(format!(
                "coefficients ({}) exceeds banks ({})",
                self.coefficients, self.banks
            )));
        }
        if self.interval_div > self.window_width {
            return Err(FeatureError::InvalidConfig(format!(
                "interval_div ({}) exceeds window_width ({})",
                self.interval_div, self.window_width
            )));
        }
        Ok(self)
    }

    /// Frame stride for overlapping framing.
    pub fn hop(&self) -> usize {
        (self.window_width / self.interval_div.max(1)).max(1)
    }
}
