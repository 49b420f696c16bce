use nalgebra::{DMatrix, RowDVector};

use crate::error::{precondition, Result};
use crate::model::dataset::{row, Dataset};
use crate::model::hyperparameters::Hyperparameters;
use crate::neighbors::engine::NeighborWeights;

/// Weighted neighbor average of `responses` at every row of `queries`.
///
/// Each query is handled independently. `responses` may have a single column
/// (e.g. a vector of realized losses). Returns a `queries.nrows() × M` matrix.
pub fn expected_response(
    responses: &DMatrix<f64>,
    covariates: &DMatrix<f64>,
    queries: &DMatrix<f64>,
    config: &Hyperparameters,
) -> Result<DMatrix<f64>> {
    check_shapes(responses, covariates, queries.ncols())?;

    let num_queries = queries.nrows();
    let m = responses.ncols();

    tracing::debug!(
        k = config.k(),
        smoother = %config.smoother(),
        samples = responses.nrows(),
        label_dim = m,
        contexts = num_queries,
        "computing expected response"
    );

    let mut out = DMatrix::<f64>::zeros(num_queries, m);
    for j in 0..num_queries {
        let query = row(queries, j);
        let estimate = weighted_average(responses, covariates, &query, config)?;
        for (c, v) in estimate.into_iter().enumerate() {
            out[(j, c)] = v;
        }
    }
    Ok(out)
}

/// Expected response at a single query context.
pub fn expected_response_at(
    responses: &DMatrix<f64>,
    covariates: &DMatrix<f64>,
    query: &[f64],
    config: &Hyperparameters,
) -> Result<Vec<f64>> {
    check_shapes(responses, covariates, query.len())?;
    weighted_average(responses, covariates, query, config)
}

fn weighted_average(
    responses: &DMatrix<f64>,
    covariates: &DMatrix<f64>,
    query: &[f64],
    config: &Hyperparameters,
) -> Result<Vec<f64>> {
    let neighbors = NeighborWeights::for_config(covariates, config, query)?;
    let total = neighbors.total_weight();
    if total.is_nan() || total <= 0.0 {
        return Err(precondition(format!(
            "neighbor weights sum to {}, cannot average",
            total
        )));
    }

    let mut acc = RowDVector::<f64>::zeros(responses.ncols());
    for (&i, &w) in neighbors.indices.iter().zip(&neighbors.weights) {
        acc += responses.row(i) * w;
    }
    acc /= total;
    Ok(acc.iter().copied().collect())
}

fn check_shapes(responses: &DMatrix<f64>, covariates: &DMatrix<f64>, query_dim: usize) -> Result<()> {
    if responses.nrows() != covariates.nrows() {
        return Err(precondition(format!(
            "responses have {} rows but covariates have {}",
            responses.nrows(),
            covariates.nrows()
        )));
    }
    if query_dim != covariates.ncols() {
        return Err(precondition(format!(
            "query contexts have {} columns but covariates have {}",
            query_dim,
            covariates.ncols()
        )));
    }
    Ok(())
}

/// Point predictor bound to a historical sample and a fixed configuration.
#[derive(Debug, Clone)]
pub struct NeighborPredictor<'a> {
    data: &'a Dataset,
    config: Hyperparameters,
}

impl<'a> NeighborPredictor<'a> {
    pub fn new(data: &'a Dataset, config: Hyperparameters) -> Self {
        Self { data, config }
    }

    pub fn config(&self) -> &Hyperparameters {
        &self.config
    }

    pub fn predict(&self, queries: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        expected_response(
            self.data.responses(),
            self.data.covariates(),
            queries,
            &self.config,
        )
    }

    pub fn predict_one(&self, query: &[f64]) -> Result<Vec<f64>> {
        expected_response_at(
            self.data.responses(),
            self.data.covariates(),
            query,
            &self.config,
        )
    }
}
