use nalgebra::DMatrix;

use crate::error::{precondition, Result};
use crate::model::hyperparameters::Hyperparameters;
use crate::model::solution::PortfolioSolution;
use crate::neighbors::engine::NeighborWeights;
use crate::solver::backend::ClarabelSolver;
use crate::solver::program::{LinearProgram, LpSolver, SolveStatus};

/// Local CVaR portfolio learner.
///
/// For a query context it keeps the tie-inclusive nearest historical returns
/// and chooses long-only, fully invested weights `z` and a threshold `b`
/// minimizing the weighted average of
///
/// ```text
/// ℓ(z, b, y) = b + (1/ε)·max(−⟨z, y⟩ − b, 0) − λ·⟨z, y⟩
/// ```
///
/// written as a linear program with one epigraph variable per neighbor.
#[derive(Debug, Clone)]
pub struct NearestNeighborsPortfolio<S = ClarabelSolver> {
    name: String,
    epsilon: f64,
    lambda: f64,
    solver: S,
}

impl NearestNeighborsPortfolio<ClarabelSolver> {
    /// Learner backed by the default interior-point solver.
    pub fn with_default_solver(name: impl Into<String>, epsilon: f64, lambda: f64) -> Result<Self> {
        Self::new(name, epsilon, lambda, ClarabelSolver::default())
    }
}

impl<S: LpSolver> NearestNeighborsPortfolio<S> {
    pub fn new(name: impl Into<String>, epsilon: f64, lambda: f64, solver: S) -> Result<Self> {
        if epsilon.is_nan() || epsilon <= 0.0 || epsilon >= 1.0 {
            return Err(precondition(format!(
                "risk level epsilon must be in (0, 1), got {}",
                epsilon
            )));
        }
        if !lambda.is_finite() {
            return Err(precondition(format!(
                "trade-off lambda must be finite, got {}",
                lambda
            )));
        }
        Ok(Self {
            name: name.into(),
            epsilon,
            lambda,
            solver,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Realized loss of allocation `z` with threshold `b` for return vector `y`.
    pub fn loss(&self, z: &[f64], b: f64, y: &[f64]) -> f64 {
        let ret: f64 = z.iter().zip(y).map(|(a, r)| a * r).sum();
        b + (-ret - b).max(0.0) / self.epsilon - self.lambda * ret
    }

    /// Loss of `(z, b)` for every row of `responses`, as an N×1 matrix.
    pub fn losses(&self, z: &[f64], b: f64, responses: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::<f64>::zeros(responses.nrows(), 1);
        let mut y = vec![0.0; responses.ncols()];
        for i in 0..responses.nrows() {
            for (c, slot) in y.iter_mut().enumerate() {
                *slot = responses[(i, c)];
            }
            out[(i, 0)] = self.loss(z, b, &y);
        }
        out
    }

    /// Optimal allocation for `query` given historical `responses`/`covariates`.
    ///
    /// A non-optimal solver outcome is returned in the solution's status rather
    /// than as an error.
    pub fn optimize(
        &self,
        responses: &DMatrix<f64>,
        covariates: &DMatrix<f64>,
        config: &Hyperparameters,
        query: &[f64],
    ) -> Result<PortfolioSolution> {
        let _span = tracing::debug_span!("optimize", name = %self.name).entered();

        if responses.nrows() != covariates.nrows() {
            return Err(precondition(format!(
                "responses have {} rows but covariates have {}",
                responses.nrows(),
                covariates.nrows()
            )));
        }
        let num_assets = responses.ncols();
        if num_assets == 0 {
            return Err(precondition("responses have no asset columns"));
        }

        tracing::debug!(
            epsilon = self.epsilon,
            lambda = self.lambda,
            samples = responses.nrows(),
            label_dim = num_assets,
            hyperparameters = %config,
            "portfolio problem"
        );

        let neighbors = NeighborWeights::for_config(covariates, config, query)?;
        let program = self.build_program(responses, &neighbors)?;
        let solved = self.solver.solve(&program);

        tracing::debug!(
            neighbors = neighbors.len(),
            status = %solved.status,
            cost = solved.objective_value,
            "portfolio solved"
        );

        if !matches!(
            solved.status,
            SolveStatus::Optimal | SolveStatus::OptimalInaccurate
        ) {
            return Ok(PortfolioSolution {
                cost: f64::NAN,
                weights: vec![f64::NAN; num_assets],
                threshold: f64::NAN,
                status: solved.status,
            });
        }

        Ok(PortfolioSolution {
            cost: solved.objective_value,
            weights: clean_weights(&solved.x[..num_assets]),
            threshold: solved.x[num_assets],
            status: solved.status,
        })
    }

    /// Linear program for the neighbor set.
    ///
    /// Variable layout: `z` in `0..M`, `b` at `M`, then one `Lᵢ` per neighbor.
    pub fn build_program(
        &self,
        responses: &DMatrix<f64>,
        neighbors: &NeighborWeights,
    ) -> Result<LinearProgram> {
        let m = responses.ncols();
        let b_var = m;
        let loss_var = |i: usize| m + 1 + i;
        let total = neighbors.total_weight();
        if total.is_nan() || total <= 0.0 {
            return Err(precondition(format!(
                "neighbor weights sum to {}, objective undefined",
                total
            )));
        }

        let mut lp = LinearProgram::new(m + 1 + neighbors.len());
        for (i, &w) in neighbors.weights.iter().enumerate() {
            lp.objective[loss_var(i)] = w / total;
        }

        // Σz = 1, z >= 0
        lp.add_equality((0..m).map(|j| (j, 1.0)).collect(), 1.0);
        for j in 0..m {
            lp.add_inequality(vec![(j, -1.0)], 0.0);
        }

        let inv_eps = 1.0 / self.epsilon;
        for (i, &row) in neighbors.indices.iter().enumerate() {
            // (1 − 1/ε)·b − (λ + 1/ε)·⟨y, z⟩ − Lᵢ <= 0
            let mut tail: Vec<(usize, f64)> = (0..m)
                .map(|j| (j, -(self.lambda + inv_eps) * responses[(row, j)]))
                .collect();
            tail.push((b_var, 1.0 - inv_eps));
            tail.push((loss_var(i), -1.0));
            lp.add_inequality(tail, 0.0);

            // b − λ·⟨y, z⟩ − Lᵢ <= 0
            let mut body: Vec<(usize, f64)> = (0..m)
                .map(|j| (j, -self.lambda * responses[(row, j)]))
                .collect();
            body.push((b_var, 1.0));
            body.push((loss_var(i), -1.0));
            lp.add_inequality(body, 0.0);
        }
        Ok(lp)
    }
}

/// Clip solver round-off below zero and rescale onto the unit simplex.
fn clean_weights(raw: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|w| w.max(0.0)).collect();
    let sum: f64 = clipped.iter().sum();
    if sum > 0.0 {
        clipped.iter().map(|w| w / sum).collect()
    } else {
        clipped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::neighbors::whitening::WhiteningTransform;

    #[test]
    fn loss_matches_piecewise_definition() {
        let p = NearestNeighborsPortfolio::with_default_solver("t", 0.2, 0.5).unwrap();
        // return 0.1, b = 0 -> 0 + 0 - 0.05
        assert!((p.loss(&[1.0], 0.0, &[0.1]) + 0.05).abs() < 1e-12);
        // return -0.1, b = 0 -> 0 + 0.1/0.2 + 0.05 = 0.55
        assert!((p.loss(&[1.0], 0.0, &[-0.1]) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn program_layout() {
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let y = DMatrix::from_row_slice(3, 2, &[0.1, 0.0, 0.2, 0.1, -0.1, 0.3]);
        let t = Arc::new(WhiteningTransform::fit(&x).unwrap());
        let hp = Hyperparameters::naive(2, t).unwrap();
        let nb = NeighborWeights::for_config(&x, &hp, &[0.1]).unwrap();
        let p = NearestNeighborsPortfolio::with_default_solver("t", 0.5, 1.0).unwrap();
        let lp = p.build_program(&y, &nb).unwrap();

        assert_eq!(lp.num_vars(), 2 + 1 + 2);
        assert_eq!(lp.equalities.len(), 1);
        assert_eq!(lp.inequalities.len(), 2 + 2 * 2);
        assert_eq!(&lp.objective[3..], &[0.5, 0.5]);
    }

    #[test]
    fn rejects_bad_risk_level() {
        assert!(NearestNeighborsPortfolio::with_default_solver("t", 0.0, 0.0).is_err());
        assert!(NearestNeighborsPortfolio::with_default_solver("t", 1.0, 0.0).is_err());
        assert!(NearestNeighborsPortfolio::with_default_solver("t", 0.1, f64::NAN).is_err());
    }
}
