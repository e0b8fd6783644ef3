use thiserror::Error;

/// Errors returned by the clustering search.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("no values to cluster")]
    Empty,

    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },

    #[error("column {column} out of range for {coefficients} coefficients")]
    Column { column: usize, coefficients: usize },

    #[error("sequence of {len} values is not a whole number of {coefficients}-coefficient frames")]
    Shape { len: usize, coefficients: usize },

    #[error("search {token} already running")]
    Busy { token: u64 },
}

impl ClusterError {
    /// Reports whether the failure is local to one search.
    ///
    /// Corrupt input data is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Empty | Self::Busy { .. })
    }
}
