use phonex_cluster::ClusterError;
use phonex_features::FeatureError;
use thiserror::Error;

use crate::mode::AlignmentMode;

/// Errors returned by alignment.
#[derive(Debug, Error)]
pub enum DtwError {
    #[error("no {side} sequence length")]
    EmptySequence { side: &'static str },

    #[error("cost matrix of {rows}x{cols} cells could not be allocated")]
    Allocation { rows: usize, cols: usize },

    #[error("no warping path through the {rows}x{cols} band")]
    Unreachable { rows: usize, cols: usize },

    #[error("mode {mode:?} cannot align against a {reference}")]
    ModeMismatch {
        mode: AlignmentMode,
        reference: &'static str,
    },

    #[error("{side} has no descriptor streams")]
    MissingDescriptors { side: &'static str },

    #[error("query has {query} coefficients per frame, reference has {reference}")]
    CoefficientMismatch { query: usize, reference: usize },

    #[error("feature stream: {0}")]
    Feature(#[from] FeatureError),

    #[error("codebook: {0}")]
    Cluster(#[from] ClusterError),
}

impl DtwError {
    /// Reports whether only the current comparison is lost.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EmptySequence { .. } | Self::Unreachable { .. } => true,
            Self::Feature(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
