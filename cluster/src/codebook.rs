use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::ClusterError;
use crate::jenks::{build_cluster, Cluster};
use crate::registry::{SearchRegistry, Token};

/// One [`Cluster`] per coefficient column. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    pub columns: Vec<Cluster>,
}

impl Codebook {
    pub fn coefficients(&self) -> usize {
        self.columns.len()
    }

    /// Nearest centroid of `column` to `value`, with its absolute distance.
    pub fn nearest(&self, column: usize, value: f32) -> Result<(f32, f32), ClusterError> {
        self.columns
            .get(column)
            .map(|c| c.nearest(value))
            .ok_or(ClusterError::Column {
                column,
                coefficients: self.columns.len(),
            })
    }
}

/// Builds a codebook from frame-major sequences of `coefficients` values
/// per frame.
///
/// Every column is searched on its own scoped thread under the token
/// `base_token · coefficients + column`, computed with wrapping arithmetic.
/// The first failing column's error is returned once all workers have
/// joined.
pub fn build_codebook(
    sequences: &[&[f32]],
    coefficients: usize,
    min_hint: usize,
    base_token: Token,
    registry: &Arc<SearchRegistry>,
    cfg: &SearchConfig,
) -> Result<Codebook, ClusterError> {
    if coefficients == 0 {
        return Err(ClusterError::Shape {
            len: sequences.iter().map(|s| s.len()).sum(),
            coefficients,
        });
    }
    if let Some(bad) = sequences.iter().find(|s| s.len() % coefficients != 0) {
        return Err(ClusterError::Shape {
            len: bad.len(),
            coefficients,
        });
    }

    let columns: Vec<Vec<f32>> = (0..coefficients)
        .map(|c| {
            sequences
                .iter()
                .flat_map(|s| s.iter().skip(c).step_by(coefficients).copied())
                .collect()
        })
        .collect();
    debug!(
        base_token,
        coefficients,
        values = columns[0].len(),
        "building codebook"
    );

    let results: Vec<Result<Cluster, ClusterError>> = thread::scope(|s| {
        let workers: Vec<_> = columns
            .iter()
            .enumerate()
            .map(|(c, values)| {
                let token = base_token.wrapping_mul(coefficients as Token).wrapping_add(c as Token);
                s.spawn(move || build_cluster(values, min_hint, token, registry, cfg))
            })
            .collect();
        workers
            .into_iter()
            .map(|w| match w.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let columns = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(Codebook { columns })
}
