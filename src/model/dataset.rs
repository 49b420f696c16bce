use nalgebra::DMatrix;

use crate::error::{precondition, Result};

/// Paired covariate (N×D) and response (N×M) samples.
///
/// Row `i` of both matrices is one observation. The matrices are never
/// modified after construction; subsets are copied out with [`Dataset::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    covariates: DMatrix<f64>,
    responses: DMatrix<f64>,
}

impl Dataset {
    pub fn new(covariates: DMatrix<f64>, responses: DMatrix<f64>) -> Result<Self> {
        if covariates.nrows() != responses.nrows() {
            return Err(precondition(format!(
                "covariates have {} rows but responses have {}",
                covariates.nrows(),
                responses.nrows()
            )));
        }
        if covariates.nrows() == 0 {
            return Err(precondition("dataset is empty"));
        }
        if covariates.ncols() == 0 || responses.ncols() == 0 {
            return Err(precondition("covariates and responses need at least one column"));
        }
        if covariates.iter().chain(responses.iter()).any(|v| !v.is_finite()) {
            return Err(precondition("dataset contains non-finite values"));
        }
        Ok(Self {
            covariates,
            responses,
        })
    }

    /// Build from row-major slices; handy for small hand-written samples.
    pub fn from_rows(covariates: &[Vec<f64>], responses: &[Vec<f64>]) -> Result<Self> {
        Self::new(rows_to_matrix(covariates)?, rows_to_matrix(responses)?)
    }

    pub fn covariates(&self) -> &DMatrix<f64> {
        &self.covariates
    }

    pub fn responses(&self) -> &DMatrix<f64> {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.covariates.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn covariate_dim(&self) -> usize {
        self.covariates.ncols()
    }

    pub fn num_assets(&self) -> usize {
        self.responses.ncols()
    }

    /// Covariate row `i` as an owned vector.
    pub fn context(&self, i: usize) -> Vec<f64> {
        row(&self.covariates, i)
    }

    /// Copy of the rows named by `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            covariates: self.covariates.select_rows(indices.iter()),
            responses: self.responses.select_rows(indices.iter()),
        }
    }
}

/// Row `i` of `m` as an owned vector.
pub fn row(m: &DMatrix<f64>, i: usize) -> Vec<f64> {
    m.row(i).iter().copied().collect()
}

/// Stack equally long rows into a matrix.
pub fn rows_to_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(precondition(format!(
            "row {} has {} columns, expected {}",
            i,
            r.len(),
            ncols
        )));
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.iter().flat_map(|r| r.iter().copied()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_preserves_pairing() {
        let ds = Dataset::from_rows(
            &[vec![0.0], vec![1.0], vec![2.0]],
            &[vec![10.0, 11.0], vec![20.0, 21.0], vec![30.0, 31.0]],
        )
        .unwrap();
        let sub = ds.select(&[2, 0]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.context(0), vec![2.0]);
        assert_eq!(row(sub.responses(), 1), vec![10.0, 11.0]);
        // source untouched
        assert_eq!(ds.context(0), vec![0.0]);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = Dataset::from_rows(&[vec![0.0], vec![1.0]], &[vec![1.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(rows_to_matrix(&[vec![0.0, 1.0], vec![2.0]]).is_err());
    }
}
