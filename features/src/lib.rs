//! Spectral feature pipeline for phoneme matching.
//!
//! Turns a time-domain signal into a flat, frame-major MFCC
//! [`FeatureSequence`], optionally with delta and delta-delta streams and
//! per-window time-domain [`Descriptors`].
//!
//! # Usage
//!
//! ```
//! use phonex_features::{Extractor, FeatureConfig};
//!
//! let extractor = Extractor::new(FeatureConfig::default()).unwrap();
//! let signal: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.05).sin()).collect();
//! let seq = extractor.extract(&signal).unwrap();
//! assert_eq!(seq.len() % seq.coefficients(), 0);
//! ```
//!
//! Pipeline per frame: Hann window → radix-2 FFT magnitudes → half-spectrum
//! mirroring → triangular mel bank → `log10` with an epsilon floor → DCT-II →
//! truncation. Normalization is a separate two-pass step, see [`Normalizer`].

mod config;
mod delta;
mod descriptors;
mod error;
mod extract;
mod fft;
mod mel;
mod normalize;
mod resample;
mod sequence;

pub use config::{FeatureConfig, MelRange};
pub use delta::delta;
pub use descriptors::{
    kurtosis, log_entropy, short_time_energy, zero_cross_rate, DescriptorKind, Descriptors,
};
pub use error::FeatureError;
pub use extract::{frame_count, framing, Extractor, Framing};
pub use fft::{fft, hann_window, magnitudes, Complex};
pub use mel::{dct, hz_to_mel, log_compress, mel_to_hz, MelBank, ENERGY_FLOOR};
pub use normalize::{Normalizer, Range};
pub use resample::{cubic_interpolate, paa, resize};
pub use sequence::{FeatureSequence, FeatureSet};
