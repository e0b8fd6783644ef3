use thiserror::Error;

/// Errors returned by feature extraction.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("signal too short for configuration: {len} samples, window width {window_width}")]
    InsufficientSignal { len: usize, window_width: usize },

    #[error("non-finite value in {stage} at index {index}")]
    NonFinite { stage: &'static str, index: usize },

    #[error("allocation of {requested} values failed")]
    Allocation { requested: usize },

    #[error("sequence of {len} values is not a whole number of {coefficients}-coefficient frames")]
    Shape { len: usize, coefficients: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl FeatureError {
    /// Reports whether the caller may skip the offending unit and carry on.
    ///
    /// Short signals and malformed sequences only affect one unit of work;
    /// numerical corruption and exhausted memory must abort the batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientSignal { .. } | Self::Shape { .. })
    }
}
