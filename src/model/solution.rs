use serde::Serialize;

use crate::solver::program::SolveStatus;

/// Result of one portfolio optimization.
///
/// `weights` and `threshold` are only meaningful when `status` is optimal;
/// on success the weights are non-negative and sum to one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSolution {
    /// Optimal weighted-average loss over the neighbor set.
    pub cost: f64,
    /// Portfolio allocation, one entry per asset.
    pub weights: Vec<f64>,
    /// Risk threshold `b` (value-at-risk level of the CVaR loss).
    pub threshold: f64,
    pub status: SolveStatus,
}

impl PortfolioSolution {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}
