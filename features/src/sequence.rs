use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::delta::delta;
use crate::descriptors::Descriptors;
use crate::error::FeatureError;

/// Flat frame-major coefficient matrix.
///
/// `values.len()` is always a non-zero multiple of `coefficients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSequence {
    coefficients: usize,
    values: Vec<f32>,
}

impl FeatureSequence {
    /// Wraps `values` as frames of `coefficients` entries each.
    pub fn new(coefficients: usize, values: Vec<f32>) -> Result<Self, FeatureError> {
        if coefficients == 0 || values.is_empty() || values.len() % coefficients != 0 {
            return Err(FeatureError::Shape {
                len: values.len(),
                coefficients,
            });
        }
        Ok(Self {
            coefficients,
            values,
        })
    }

    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.values.len() / self.coefficients
    }

    /// Total number of values (`frames * coefficients`).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed sequence.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns frame `i`. Panics if out of range.
    pub fn frame(&self, i: usize) -> &[f32] {
        &self.values[i * self.coefficients..(i + 1) * self.coefficients]
    }

    pub fn iter_frames(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.coefficients)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Collects coefficient `c` of every frame.
    pub fn column(&self, c: usize) -> Vec<f32> {
        self.iter_frames().map(|f| f[c]).collect()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Everything extracted from one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub mfcc: FeatureSequence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<FeatureSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_delta: Option<FeatureSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptors: Option<Descriptors>,
}

impl FeatureSet {
    pub fn new(mfcc: FeatureSequence) -> Self {
        Self {
            mfcc,
            delta: None,
            delta_delta: None,
            descriptors: None,
        }
    }

    /// Number of MFCC frames.
    pub fn frames(&self) -> usize {
        self.mfcc.frames()
    }

    /// Returns the stored delta stream, deriving it when absent.
    pub fn delta_stream(&self) -> Result<Cow<'_, FeatureSequence>, FeatureError> {
        match &self.delta {
            Some(d) => Ok(Cow::Borrowed(d)),
            None => delta(&self.mfcc).map(Cow::Owned),
        }
    }

    /// Returns the stored delta-delta stream, deriving it when absent.
    pub fn delta_delta_stream(&self) -> Result<Cow<'_, FeatureSequence>, FeatureError> {
        match &self.delta_delta {
            Some(dd) => Ok(Cow::Borrowed(dd)),
            None => {
                let d = self.delta_stream()?;
                delta(&d).map(Cow::Owned)
            }
        }
    }
}
