use nalgebra::{Cholesky, DMatrix};

use crate::error::{precondition, PortfolioError, Result};

/// Upper-triangular Cholesky factor `R` of the ridge-regularized covariance of
/// a covariate sample, with `Rᵗ·R = cov(X) + I/N`.
///
/// Distances are computed by forward substitution against `Rᵗ`, so the
/// inverse covariance is never formed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteningTransform {
    upper: DMatrix<f64>,
    sample_size: usize,
}

impl WhiteningTransform {
    /// Fit the transform to the rows of `covariates` (N×D, N > 1).
    pub fn fit(covariates: &DMatrix<f64>) -> Result<Self> {
        let (n, d) = covariates.shape();
        if n < 2 {
            return Err(precondition(format!(
                "whitening needs at least 2 covariate rows, got {}",
                n
            )));
        }
        if d == 0 {
            return Err(precondition("covariate matrix has no columns"));
        }
        if covariates.iter().any(|v| !v.is_finite()) {
            return Err(precondition("covariate matrix contains non-finite values"));
        }

        let regularized = regularized_covariance(covariates);
        let cholesky = Cholesky::new(regularized).ok_or_else(|| {
            PortfolioError::Numerical(format!(
                "regularized {}x{} covariance is not positive definite",
                d, d
            ))
        })?;
        let upper = cholesky.l().transpose();

        tracing::debug!(
            samples = n,
            covariates = d,
            "fitted whitening transform"
        );

        Ok(Self {
            upper,
            sample_size: n,
        })
    }

    /// Covariate dimension D.
    pub fn dimension(&self) -> usize {
        self.upper.nrows()
    }

    /// Number of rows the transform was fitted on.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn upper(&self) -> &DMatrix<f64> {
        &self.upper
    }

    /// Solve `Rᵗ·z = rhs` in place by forward substitution.
    pub fn forward_substitute(&self, rhs: &mut [f64]) {
        let d = self.dimension();
        debug_assert_eq!(rhs.len(), d);
        for i in 0..d {
            let mut acc = rhs[i];
            for j in 0..i {
                // (Rᵗ)[i, j] == R[j, i]
                acc -= self.upper[(j, i)] * rhs[j];
            }
            rhs[i] = acc / self.upper[(i, i)];
        }
    }

    /// Mahalanobis distance between `point` and `query` under the fitted covariance.
    pub fn distance(&self, point: &[f64], query: &[f64]) -> f64 {
        let mut z: Vec<f64> = point.iter().zip(query).map(|(p, q)| p - q).collect();
        self.forward_substitute(&mut z);
        z.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Distance from every row of `covariates` to `query`, in row order.
    pub fn distances(&self, covariates: &DMatrix<f64>, query: &[f64]) -> Result<Vec<f64>> {
        let d = self.dimension();
        if covariates.ncols() != d || query.len() != d {
            return Err(precondition(format!(
                "dimension mismatch: transform is {}-dimensional, covariates have {} columns, query has {} entries",
                d,
                covariates.ncols(),
                query.len()
            )));
        }

        let mut scratch = vec![0.0; d];
        let distances = (0..covariates.nrows())
            .map(|i| {
                for (c, slot) in scratch.iter_mut().enumerate() {
                    *slot = covariates[(i, c)] - query[c];
                }
                self.forward_substitute(&mut scratch);
                scratch.iter().map(|v| v * v).sum::<f64>().sqrt()
            })
            .collect();
        Ok(distances)
    }
}

/// Population covariance of the columns (denominator N) plus the ridge `I/N`.
fn regularized_covariance(x: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, d) = x.shape();
    let nf = n as f64;
    let means = x.row_mean();

    let mut centered = x.clone();
    for (c, mut column) in centered.column_iter_mut().enumerate() {
        column.add_scalar_mut(-means[c]);
    }

    let mut cov = centered.tr_mul(&centered) / nf;
    cov += DMatrix::<f64>::identity(d, d) / nf;
    cov
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_reproduces_regularized_covariance() {
        let x = DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 1.0, 3.0, 2.0, 2.0, 5.0, 7.0]);
        let t = WhiteningTransform::fit(&x).unwrap();
        let r = t.upper();
        let product = r.transpose() * r;
        let expected = regularized_covariance(&x);
        for i in 0..2 {
            for j in 0..2 {
                assert!((product[(i, j)] - expected[(i, j)]).abs() < 1e-12);
            }
        }
        assert_eq!(r[(1, 0)], 0.0);
    }

    #[test]
    fn one_dimensional_distance_is_scaled_absolute_difference() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let t = WhiteningTransform::fit(&x).unwrap();
        // var = 1.25, ridge = 0.25
        let sd = 1.5f64.sqrt();
        assert!((t.distance(&[3.0], &[1.5]) - 1.5 / sd).abs() < 1e-12);
    }

    #[test]
    fn rejects_single_row() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(
            WhiteningTransform::fit(&x),
            Err(PortfolioError::Precondition(_))
        ));
    }
}
