use std::time::Instant;

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{precondition, PortfolioError, Result};
use crate::estimator::expected_response_at;
use crate::model::dataset::Dataset;
use crate::model::hyperparameters::Hyperparameters;
use crate::model::solution::PortfolioSolution;
use crate::portfolio::NearestNeighborsPortfolio;
use crate::selector::{HyperparameterSelector, Selection};
use crate::solver::program::LpSolver;

/// What an average-cost computation does with a non-optimal solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonOptimalPolicy {
    /// Abort the aggregate with [`PortfolioError::NonOptimal`].
    #[default]
    Fail,
    /// Leave the context out of the average and count it.
    Skip,
}

/// Average cost over a set of contexts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    /// Mean over the contexts that were kept; NaN when none were.
    pub mean_cost: f64,
    pub contexts: usize,
    pub skipped: usize,
}

impl CostEstimate {
    fn from_samples(samples: &[Option<f64>]) -> Self {
        let kept: Vec<f64> = samples.iter().flatten().copied().collect();
        let mean_cost = if kept.is_empty() {
            f64::NAN
        } else {
            kept.iter().sum::<f64>() / kept.len() as f64
        };
        Self {
            mean_cost,
            contexts: samples.len(),
            skipped: samples.len() - kept.len(),
        }
    }
}

/// Compares full-information and training-only learners.
///
/// "Full information" means hyperparameters chosen on the whole dataset;
/// the training learner only sees a subsample and is scored on the rest.
#[derive(Debug, Clone)]
pub struct Evaluator<'a, S> {
    learner: &'a NearestNeighborsPortfolio<S>,
    selector: &'a HyperparameterSelector,
    policy: NonOptimalPolicy,
    parallel: bool,
}

impl<'a, S: LpSolver> Evaluator<'a, S> {
    pub fn new(
        learner: &'a NearestNeighborsPortfolio<S>,
        selector: &'a HyperparameterSelector,
    ) -> Self {
        Self {
            learner,
            selector,
            policy: NonOptimalPolicy::default(),
            parallel: false,
        }
    }

    pub fn with_policy(mut self, policy: NonOptimalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate contexts on the rayon pool instead of sequentially.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn policy(&self) -> NonOptimalPolicy {
        self.policy
    }

    pub fn selector(&self) -> &HyperparameterSelector {
        self.selector
    }

    pub fn full_information_hyperparameters<R: Rng + ?Sized>(
        &self,
        data: &Dataset,
        rng: &mut R,
    ) -> Result<Selection> {
        let started = Instant::now();
        let selection = self.selector.select(data, rng)?;
        tracing::info!(
            name = self.learner.name(),
            chosen = %selection.hyperparameters,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "full-information hyperparameters"
        );
        Ok(selection)
    }

    pub fn training_hyperparameters<R: Rng + ?Sized>(
        &self,
        train: &Dataset,
        rng: &mut R,
    ) -> Result<Selection> {
        let started = Instant::now();
        let selection = self.selector.select(train, rng)?;
        tracing::info!(
            name = self.learner.name(),
            train_size = train.len(),
            chosen = %selection.hyperparameters,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training hyperparameters"
        );
        Ok(selection)
    }

    /// Mean optimal objective when every historical context is solved against
    /// the full dataset with full-information hyperparameters.
    pub fn full_information_cost(
        &self,
        data: &Dataset,
        full_info: &Hyperparameters,
    ) -> Result<CostEstimate> {
        let started = Instant::now();
        let samples = self.map_contexts(data.len(), |idx| {
            let context = data.context(idx);
            let solution =
                self.learner
                    .optimize(data.responses(), data.covariates(), full_info, &context)?;
            let cost = self.admit(idx, &solution)?.map(|s| s.cost);
            Ok(cost)
        })?;
        let estimate = CostEstimate::from_samples(&samples);
        tracing::info!(
            name = self.learner.name(),
            mean_cost = estimate.mean_cost,
            contexts = estimate.contexts,
            skipped = estimate.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "full-information cost"
        );
        Ok(estimate)
    }

    /// Out-of-sample cost of the training learner, measured against the full
    /// dataset.
    ///
    /// For every held-out context the learner is solved on `train`; its `(z, b)`
    /// is then scored on every row of `data`, and the losses are averaged with
    /// the neighbor weights of `full_info` at that context.
    pub fn training_model_cost(
        &self,
        data: &Dataset,
        train: &Dataset,
        holdout: &Dataset,
        training: &Hyperparameters,
        full_info: &Hyperparameters,
    ) -> Result<CostEstimate> {
        if holdout.is_empty() {
            return Err(precondition("no held-out contexts to evaluate"));
        }
        let started = Instant::now();
        tracing::info!(
            name = self.learner.name(),
            oos_samples = holdout.len(),
            "out-of-sample test for training model"
        );

        let samples = self.map_contexts(holdout.len(), |idx| {
            if idx % 10 == 0 {
                tracing::debug!(idx, "out-of-sample context");
            }
            let context = holdout.context(idx);
            let solution =
                self.learner
                    .optimize(train.responses(), train.covariates(), training, &context)?;
            let Some(solution) = self.admit(idx, &solution)? else {
                return Ok(None);
            };
            let losses = self
                .learner
                .losses(&solution.weights, solution.threshold, data.responses());
            let true_cost = expected_response_at(&losses, data.covariates(), &context, full_info)?;
            Ok(Some(true_cost[0]))
        })?;

        let estimate = CostEstimate::from_samples(&samples);
        tracing::info!(
            name = self.learner.name(),
            mean_cost = estimate.mean_cost,
            contexts = estimate.contexts,
            skipped = estimate.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training-model out-of-sample cost"
        );
        Ok(estimate)
    }

    /// Apply the non-optimal policy to one solve.
    fn admit<'s>(
        &self,
        context: usize,
        solution: &'s PortfolioSolution,
    ) -> Result<Option<&'s PortfolioSolution>> {
        if solution.is_optimal() {
            return Ok(Some(solution));
        }
        match self.policy {
            NonOptimalPolicy::Fail => Err(PortfolioError::NonOptimal {
                context,
                status: solution.status.to_string(),
            }),
            NonOptimalPolicy::Skip => {
                tracing::warn!(
                    name = self.learner.name(),
                    context,
                    status = %solution.status,
                    "skipping non-optimal solve"
                );
                Ok(None)
            }
        }
    }

    /// Run `f` for every context index, keeping results in index order so the
    /// final sum does not depend on scheduling.
    fn map_contexts<F>(&self, n: usize, f: F) -> Result<Vec<Option<f64>>>
    where
        F: Fn(usize) -> Result<Option<f64>> + Sync + Send,
    {
        if self.parallel {
            (0..n).into_par_iter().map(f).collect()
        } else {
            (0..n).map(f).collect()
        }
    }
}
