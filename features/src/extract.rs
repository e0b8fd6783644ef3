use std::borrow::Cow;

use tracing::{debug, warn};

use crate::config::FeatureConfig;
use crate::delta::delta;
use crate::descriptors::Descriptors;
use crate::error::FeatureError;
use crate::fft::{hann_window, magnitudes};
use crate::mel::{dct, log_compress, MelBank};
use crate::resample::paa;
use crate::sequence::{FeatureSequence, FeatureSet};

/// How a signal is cut into analysis frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub count: usize,
    pub stride: usize,
}

/// Resolves the framing for a signal of `len` samples (before decimation).
///
/// Overlapping frames advance by `window_width / interval_div`; when that
/// yields no frames the signal is cut into non-overlapping windows instead.
/// Both paths respect `frame_limit`. A result with `count == 0` means the
/// signal is too short for the configuration.
pub fn framing(len: usize, cfg: &FeatureConfig) -> Framing {
    let width = if cfg.paa_enabled { len / cfg.paa.max(1) } else { len };
    let ww = cfg.window_width;
    let hop = cfg.hop();
    let limit = cfg.frame_limit.unwrap_or(usize::MAX);

    let overlapping = (width as i64 - ww as i64) / hop as i64;
    if overlapping > 0 {
        return Framing {
            count: (overlapping as usize).min(limit),
            stride: hop,
        };
    }
    Framing {
        count: (width / ww).min(limit),
        stride: ww,
    }
}

/// Number of frames [`Extractor::extract`] produces for a signal of `len`
/// samples, without running the pipeline.
pub fn frame_count(len: usize, cfg: &FeatureConfig) -> usize {
    framing(len, cfg).count
}

/// MFCC sequence extractor.
///
/// Holds the window and filter bank so repeated calls skip their setup.
#[derive(Debug, Clone)]
pub struct Extractor {
    cfg: FeatureConfig,
    window: Vec<f64>,
    mel_bank: MelBank,
}

impl Extractor {
    /// Creates an extractor, validating the config.
    pub fn new(cfg: FeatureConfig) -> Result<Self, FeatureError> {
        let cfg = cfg.with_defaults()?;
        let window = hann_window(cfg.window_width);
        let mel_bank = MelBank::new(
            cfg.window_width / 2,
            cfg.banks,
            cfg.nfft,
            cfg.sample_rate,
            cfg.mel_range,
        );
        Ok(Self {
            cfg,
            window,
            mel_bank,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Extracts the MFCC sequence of `signal`.
    ///
    /// Each frame is Hann-windowed, transformed to a half magnitude spectrum
    /// whose bins are mirrored, passed through the mel bank, log-compressed
    /// and DCT'd, then truncated to `coefficients` values.
    pub fn extract(&self, signal: &[f32]) -> Result<FeatureSequence, FeatureError> {
        let cfg = &self.cfg;
        let framing = framing(signal.len(), cfg);
        if framing.count == 0 {
            return Err(FeatureError::InsufficientSignal {
                len: signal.len(),
                window_width: cfg.window_width,
            });
        }
        if framing.stride == cfg.window_width && cfg.interval_div > 1 {
            debug!(len = signal.len(), frames = framing.count, "falling back to non-overlapping frames");
        }

        let samples: Cow<'_, [f32]> = if cfg.paa_enabled {
            Cow::Owned(paa(signal, cfg.paa))
        } else {
            Cow::Borrowed(signal)
        };

        let ww = cfg.window_width;
        let keep = cfg.coefficients;
        let total = framing.count * keep;
        let mut values = Vec::new();
        values
            .try_reserve_exact(total)
            .map_err(|_| FeatureError::Allocation { requested: total })?;

        let mut frame = vec![0.0f64; ww];
        for t in 0..framing.count {
            let start = t * framing.stride;
            for (i, slot) in frame.iter_mut().enumerate() {
                *slot = samples[start + i] as f64 * self.window[i];
            }

            let mut mags = magnitudes(&frame);
            // Mirror the half spectrum.
            mags.reverse();

            let mut energies = self.mel_bank.apply(&mags);
            log_compress(&mut energies);
            let cepstrum = dct(&energies);

            for (m, &c) in cepstrum.iter().take(keep).enumerate() {
                if c.is_finite() {
                    values.push(c as f32);
                } else {
                    warn!(frame = t, coefficient = m, "non-finite cepstral value replaced with 0");
                    values.push(0.0);
                }
            }
        }

        FeatureSequence::new(keep, values)
    }

    /// Extracts the MFCC sequence plus the streams enabled in the config.
    pub fn extract_set(&self, signal: &[f32]) -> Result<FeatureSet, FeatureError> {
        let mut set = FeatureSet::new(self.extract(signal)?);
        if self.cfg.delta {
            let d = delta(&set.mfcc)?;
            if self.cfg.delta_delta {
                set.delta_delta = Some(delta(&d)?);
            }
            set.delta = Some(d);
        }
        if self.cfg.descriptors {
            set.descriptors = Some(Descriptors::compute(signal, self.cfg.window_width));
        }
        Ok(set)
    }
}
