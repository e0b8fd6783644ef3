//! Banded dynamic time warping for phoneme feature sets.
//!
//! [`align`] compares a query [`FeatureSet`](phonex_features::FeatureSet)
//! with a [`Reference`] (a stored prototype or a centroid codebook) under an
//! [`AlignmentMode`]. The cost matrix is restricted to a diagonal band whose
//! half-width is a fraction of the longer operand; see [`band_width`].
//!
//! ```
//! use phonex_dtw::{align, AlignmentMode, DtwConfig, Reference};
//! use phonex_features::{FeatureSequence, FeatureSet};
//!
//! let seq = FeatureSequence::new(2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
//! let set = FeatureSet::new(seq);
//! let d = align(&set, Reference::Prototype(&set), AlignmentMode::Raw, &DtwConfig::default()).unwrap();
//! assert_eq!(d, 0.0);
//! ```

mod align;
mod config;
mod error;
mod mode;

pub use align::{align, band_width, quantized_distance, scalar_distance, sequence_distance};
pub use config::DtwConfig;
pub use error::DtwError;
pub use mode::{AlignmentMode, Reference};
