use phonex_cluster::ClusterError;
use phonex_dtw::DtwError;
use phonex_features::FeatureError;
use thiserror::Error;

use crate::catalog::ClassId;

/// Errors returned by training and classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("unknown class id {0}")]
    UnknownClass(ClassId),

    #[error("unknown phoneme {0:?}")]
    UnknownName(String),

    #[error("model has no prototypes")]
    EmptyModel,

    #[error("training class {class} with a {len}-sample signal: {source}")]
    Training {
        class: ClassId,
        len: usize,
        #[source]
        source: FeatureError,
    },

    #[error("codebook for class {class}: {source}")]
    Codebook {
        class: ClassId,
        #[source]
        source: ClusterError,
    },

    #[error("comparing against class {class} prototype {prototype:?}: {source}")]
    Comparison {
        class: ClassId,
        prototype: Option<usize>,
        #[source]
        source: DtwError,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("features: {0}")]
    Feature(#[from] FeatureError),

    #[error("alignment: {0}")]
    Dtw(#[from] DtwError),

    #[error("clustering: {0}")]
    Cluster(#[from] ClusterError),
}

impl ClassifyError {
    /// Reports whether the failed unit can be skipped.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Feature(e) => e.is_recoverable(),
            Self::Dtw(e) => e.is_recoverable(),
            Self::UnknownClass(_) | Self::UnknownName(_) => true,
            _ => false,
        }
    }
}
