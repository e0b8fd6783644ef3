use phonex_cluster::Codebook;
use phonex_features::{DescriptorKind, FeatureSet};
use serde::{Deserialize, Serialize};

/// Which streams an alignment compares and how their scores combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// MFCC frames only.
    #[default]
    Raw,
    /// MFCC score plus the delta stream's score.
    Delta,
    /// MFCC, delta and delta-delta scores summed.
    DeltaDelta,
    /// Squared distance of each query frame to a codebook's centroids.
    Quantized,
    /// One descriptor stream, compared value by value.
    Descriptor(DescriptorKind),
}

impl AlignmentMode {
    pub fn needs_delta(self) -> bool {
        matches!(self, Self::Delta | Self::DeltaDelta)
    }

    pub fn needs_delta_delta(self) -> bool {
        matches!(self, Self::DeltaDelta)
    }

    pub fn needs_codebook(self) -> bool {
        matches!(self, Self::Quantized)
    }
}

/// What a query is aligned against.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Prototype(&'a FeatureSet),
    Codebook(&'a Codebook),
}

impl Reference<'_> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Prototype(_) => "prototype",
            Self::Codebook(_) => "codebook",
        }
    }
}

impl<'a> From<&'a FeatureSet> for Reference<'a> {
    fn from(set: &'a FeatureSet) -> Self {
        Self::Prototype(set)
    }
}

impl<'a> From<&'a Codebook> for Reference<'a> {
    fn from(book: &'a Codebook) -> Self {
        Self::Codebook(book)
    }
}
