//! Two-pass min-max rescaling of MFCC and derivative streams.
//!
//! Pass one calls [`Normalizer::observe`] on every trained [`FeatureSet`];
//! pass two calls [`Normalizer::apply`]. The passes are never interleaved
//! with extraction, so ranges cover the whole corpus before anything moves.

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::sequence::{FeatureSequence, FeatureSet};

const MFCC_SCALE: f32 = 5.0;
const DELTA_SCALE: f32 = 3.0;
const DELTA_DELTA_SCALE: f32 = 1.0;

/// Running minimum and maximum of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            min: f32::MAX,
            max: f32::MIN,
        }
    }
}

impl Range {
    pub fn observe(&mut self, values: &[f32]) {
        for &v in values {
            if v > self.max {
                self.max = v;
            }
            if v < self.min {
                self.min = v;
            }
        }
    }

    pub fn merge(&mut self, other: &Range) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// True until at least one value has been observed.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Maps `[min, max]` onto `[0, scale]` in place.
    fn rescale(&self, seq: &mut FeatureSequence, scale: f32, stage: &'static str) -> Result<(), FeatureError> {
        let span = self.max - self.min;
        if self.is_empty() || span <= 0.0 || !span.is_finite() {
            return Err(FeatureError::NonFinite { stage, index: 0 });
        }
        for (i, v) in seq.values_mut().iter_mut().enumerate() {
            *v = (*v - self.min) / span * scale;
            if !v.is_finite() {
                return Err(FeatureError::NonFinite { stage, index: i });
            }
        }
        Ok(())
    }
}

/// Corpus-wide ranges for each stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mfcc: Range,
    pub delta: Range,
    pub delta_delta: Range,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// First pass: widens the ranges with every stream present in `set`.
    pub fn observe(&mut self, set: &FeatureSet) {
        self.mfcc.observe(set.mfcc.values());
        if let Some(d) = &set.delta {
            self.delta.observe(d.values());
        }
        if let Some(dd) = &set.delta_delta {
            self.delta_delta.observe(dd.values());
        }
    }

    /// Folds another normalizer's ranges into this one.
    pub fn merge(&mut self, other: &Normalizer) {
        self.mfcc.merge(&other.mfcc);
        self.delta.merge(&other.delta);
        self.delta_delta.merge(&other.delta_delta);
    }

    /// Second pass: rescales every stream present in `set`.
    ///
    /// MFCCs land in `[0, 5]`, deltas in `[0, 3]` and delta-deltas in
    /// `[0, 1]` for values inside the observed range. A stream whose range
    /// was never observed, or is degenerate, fails with `NonFinite`.
    pub fn apply(&self, set: &mut FeatureSet) -> Result<(), FeatureError> {
        self.mfcc.rescale(&mut set.mfcc, MFCC_SCALE, "mfcc normalization")?;
        if let Some(d) = &mut set.delta {
            self.delta.rescale(d, DELTA_SCALE, "delta normalization")?;
        }
        if let Some(dd) = &mut set.delta_delta {
            self.delta_delta
                .rescale(dd, DELTA_DELTA_SCALE, "delta-delta normalization")?;
        }
        Ok(())
    }
}
