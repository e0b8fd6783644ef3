//! Iterative Jenks natural-breaks search and centroid codebooks.
//!
//! [`build_cluster`] looks for the smallest cluster count whose goodness of
//! variance fit clears an adaptively relaxed threshold. Searches running on
//! different threads share one [`SearchRegistry`]; each is shadowed by a
//! [`Watchdog`] that logs progress until the search accepts.
//!
//! [`build_codebook`] runs one search per coefficient column of a set of
//! frame-major sequences and collects the results into a [`Codebook`].

mod codebook;
mod config;
mod error;
mod jenks;
mod registry;

pub use codebook::{build_codebook, Codebook};
pub use config::SearchConfig;
pub use error::ClusterError;
pub use jenks::{build_cluster, Cluster};
pub use registry::{SearchRegistry, SearchState, Token, Watchdog};
