use std::sync::Arc;

use rand::Rng;

use crate::error::{precondition, Result};
use crate::estimator::expected_response;
use crate::model::dataset::Dataset;
use crate::model::hyperparameters::Hyperparameters;
use crate::model::split::{Split, SplitMode};
use crate::neighbors::smoother::Smoother;
use crate::neighbors::whitening::WhiteningTransform;

pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// Number of evenly spaced k candidates before rounding and deduplication.
pub const K_GRID_POINTS: usize = 20;

/// Winning configuration of a grid search.
#[derive(Debug, Clone)]
pub struct Selection {
    pub hyperparameters: Hyperparameters,
    /// Sum of squared validation errors of the winner.
    pub validation_error: f64,
    pub candidates_evaluated: usize,
    pub train_size: usize,
    pub validation_size: usize,
}

/// Grid search over (smoother, k, bandwidth) scored by held-out squared error.
#[derive(Debug, Clone)]
pub struct HyperparameterSelector {
    validation_fraction: f64,
    smoothers: Vec<Smoother>,
    mode: SplitMode,
}

impl Default for HyperparameterSelector {
    fn default() -> Self {
        Self {
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            smoothers: vec![Smoother::Naive],
            mode: SplitMode::Random,
        }
    }
}

impl HyperparameterSelector {
    pub fn new(validation_fraction: f64, smoothers: Vec<Smoother>, mode: SplitMode) -> Result<Self> {
        if validation_fraction.is_nan() || validation_fraction <= 0.0 || validation_fraction >= 1.0 {
            return Err(precondition(format!(
                "validation fraction must be in (0, 1), got {}",
                validation_fraction
            )));
        }
        if smoothers.is_empty() {
            return Err(precondition("at least one smoother is required"));
        }
        for s in &smoothers {
            s.ensure_implemented()?;
        }
        Ok(Self {
            validation_fraction,
            smoothers,
            mode,
        })
    }

    pub fn with_mode(mut self, mode: SplitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validation_fraction(&self) -> f64 {
        self.validation_fraction
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Number of validation rows for `n` samples, rounded half-to-even.
    ///
    /// Fails when the validation side would be empty or the training side too
    /// small to fit a whitening transform.
    pub fn validation_size(&self, n: usize) -> Result<usize> {
        let validation_size = (n as f64 * self.validation_fraction).round_ties_even() as usize;
        if validation_size == 0 {
            return Err(precondition(format!(
                "validation set is empty: {} samples at fraction {}",
                n, self.validation_fraction
            )));
        }
        if validation_size + 2 > n {
            return Err(precondition(format!(
                "training set needs at least 2 rows: {} samples at fraction {}",
                n, self.validation_fraction
            )));
        }
        Ok(validation_size)
    }

    /// Pick the configuration with the lowest validation error on `data`.
    ///
    /// The whitening transform is fitted once on the training covariates only
    /// and shared by every candidate. Ties keep the first candidate in grid
    /// order.
    pub fn select<R: Rng + ?Sized>(&self, data: &Dataset, rng: &mut R) -> Result<Selection> {
        let n = data.len();
        let validation_size = self.validation_size(n)?;

        let split = Split::with_holdout_size(n, validation_size, self.mode, rng)?;
        let train = data.select(&split.train);
        let validation = data.select(&split.holdout);
        let k_list = candidate_k_values(train.len())?;

        tracing::debug!(
            samples = n,
            label_dim = data.num_assets(),
            covariate_dim = data.covariate_dim(),
            validation_fraction = self.validation_fraction,
            smoothers = ?self.smoothers,
            k_candidates = k_list.len(),
            "hyperparameter search"
        );

        let whitening = Arc::new(WhiteningTransform::fit(train.covariates())?);

        let mut best: Option<(Hyperparameters, f64)> = None;
        let mut evaluated = 0;
        for &smoother in &self.smoothers {
            let bandwidths = smoother.bandwidth_grid()?;
            for &k in &k_list {
                for &bandwidth in &bandwidths {
                    let candidate = Hyperparameters::new(k, smoother, bandwidth, whitening.clone())?;
                    let predicted = expected_response(
                        train.responses(),
                        train.covariates(),
                        validation.covariates(),
                        &candidate,
                    )?;
                    let score = (validation.responses() - predicted).norm_squared();
                    evaluated += 1;

                    tracing::debug!(%candidate, score, "scored candidate");

                    let improves = match &best {
                        None => true,
                        Some((_, best_score)) => score < *best_score,
                    };
                    if improves {
                        best = Some((candidate, score));
                    }
                }
            }
        }

        let (hyperparameters, validation_error) =
            best.ok_or_else(|| precondition("hyperparameter grid is empty"))?;

        tracing::debug!(
            chosen = %hyperparameters,
            validation_error,
            evaluated,
            "selected hyperparameters"
        );

        Ok(Selection {
            hyperparameters,
            validation_error,
            candidates_evaluated: evaluated,
            train_size: train.len(),
            validation_size: validation.len(),
        })
    }
}

/// Candidate neighbor counts bracketing `√n` by a factor of 1.5 on each side.
///
/// Values are [`K_GRID_POINTS`] evenly spaced points rounded half-to-even,
/// deduplicated and ascending; every value lies in `[1, n]`.
pub fn candidate_k_values(n: usize) -> Result<Vec<usize>> {
    if n == 0 {
        return Err(precondition("cannot choose k from an empty training set"));
    }
    let root = (n as f64).sqrt();
    let lo = ((root / 1.5).floor() as usize).max(1);
    let hi = ((root * 1.5).ceil() as usize).min(n);

    let span = hi as f64 - lo as f64;
    let steps = (K_GRID_POINTS - 1) as f64;
    let mut ks: Vec<usize> = (0..K_GRID_POINTS)
        .map(|i| (lo as f64 + span * i as f64 / steps).round_ties_even() as usize)
        .collect();
    ks.dedup();
    Ok(ks)
}
