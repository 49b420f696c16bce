use nalgebra::DMatrix;

use crate::error::{precondition, Result};
use crate::model::hyperparameters::Hyperparameters;
use crate::neighbors::smoother::Smoother;
use crate::neighbors::whitening::WhiteningTransform;

/// Slack added to the k-th distance so floating-point ties are kept.
pub const TIE_TOLERANCE: f64 = 1e-7;

/// Tie-inclusive nearest-neighbor set of a single query context.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborWeights {
    /// Row indices into the historical sample, nearest first.
    pub indices: Vec<usize>,
    /// Whitened distance of each neighbor (parallel to `indices`).
    pub distances: Vec<f64>,
    /// Raw kernel weights (parallel to `indices`, not normalized).
    pub weights: Vec<f64>,
}

impl NeighborWeights {
    /// Neighbors of `query` among the rows of `covariates` under `config`.
    pub fn for_config(
        covariates: &DMatrix<f64>,
        config: &Hyperparameters,
        query: &[f64],
    ) -> Result<Self> {
        inclusive_neighbors(
            covariates,
            config.whitening(),
            query,
            config.k(),
            config.smoother(),
            config.bandwidth(),
        )
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Find the tie-inclusive `k` nearest rows of `covariates` to `query` and weight
/// them with `smoother(distance / bandwidth)`.
///
/// The returned set contains every row whose whitened distance is within
/// [`TIE_TOLERANCE`] of the k-th smallest distance, so it may hold more than `k`
/// rows. Rows at equal distance keep their original order.
pub fn inclusive_neighbors(
    covariates: &DMatrix<f64>,
    transform: &WhiteningTransform,
    query: &[f64],
    k: usize,
    smoother: Smoother,
    bandwidth: f64,
) -> Result<NeighborWeights> {
    let n = covariates.nrows();
    if k == 0 || k > n {
        return Err(precondition(format!(
            "neighbor count k={} must be in [1, {}]",
            k, n
        )));
    }
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Err(precondition(format!(
            "bandwidth must be positive and finite, got {}",
            bandwidth
        )));
    }
    smoother.ensure_implemented()?;
    if query.iter().any(|v| !v.is_finite()) {
        return Err(precondition("query context contains non-finite values"));
    }

    let distances = transform.distances(covariates, query)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));

    let boundary = distances[order[k - 1]] + TIE_TOLERANCE;
    let inclusive_k = order.partition_point(|&i| distances[i] <= boundary);

    let indices: Vec<usize> = order[..inclusive_k].to_vec();
    let neighbor_distances: Vec<f64> = indices.iter().map(|&i| distances[i]).collect();
    let weights = neighbor_distances
        .iter()
        .map(|&d| smoother.weight(d / bandwidth))
        .collect::<Result<Vec<f64>>>()?;

    if inclusive_k > k {
        tracing::trace!(k, inclusive_k, "expanded neighbor set to include ties");
    }

    Ok(NeighborWeights {
        indices,
        distances: neighbor_distances,
        weights,
    })
}
