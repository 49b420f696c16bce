use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::error::{precondition, Result};
use crate::evaluation::{CostEstimate, Evaluator};
use crate::model::dataset::Dataset;
use crate::model::split::{Split, SplitMode};
use crate::solver::program::LpSolver;

/// Training sample sizes and repetitions of a simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationPlan {
    pub num_samples: Vec<usize>,
    pub num_iterations: usize,
    pub mode: SplitMode,
}

impl SimulationPlan {
    pub fn new(num_samples: Vec<usize>, num_iterations: usize, mode: SplitMode) -> Result<Self> {
        if num_samples.is_empty() {
            return Err(precondition("at least one training sample size is required"));
        }
        if num_iterations == 0 {
            return Err(precondition("iteration count must be >= 1"));
        }
        Ok(Self {
            num_samples,
            num_iterations,
            mode,
        })
    }
}

/// One (sample size, iteration) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRecord {
    pub num_samples: usize,
    pub iteration: usize,
    pub k_train: usize,
    pub training_validation_error: f64,
    pub training_cost: CostEstimate,
    /// Training out-of-sample cost minus the full-information cost.
    pub excess_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullInformationSummary {
    pub k: usize,
    pub validation_error: f64,
    pub cost: CostEstimate,
}

/// Per-sample-size averages over iterations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSizeSummary {
    pub num_samples: usize,
    pub iterations: usize,
    pub mean_k: f64,
    pub mean_training_cost: f64,
    pub mean_excess_cost: f64,
    pub skipped_contexts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub name: String,
    pub epsilon: f64,
    pub lambda: f64,
    pub mode: SplitMode,
    pub samples: usize,
    pub full_information: FullInformationSummary,
    pub records: Vec<SimulationRecord>,
    pub summaries: Vec<SampleSizeSummary>,
    pub generated_at: DateTime<Utc>,
}

impl SimulationReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)?;
        Ok(())
    }
}

/// Drives the full-information vs training-model comparison.
pub struct SimulationRunner<'a, S> {
    evaluator: Evaluator<'a, S>,
    plan: SimulationPlan,
}

impl<'a, S: LpSolver> SimulationRunner<'a, S> {
    pub fn new(evaluator: Evaluator<'a, S>, plan: SimulationPlan) -> Self {
        Self { evaluator, plan }
    }

    pub fn plan(&self) -> &SimulationPlan {
        &self.plan
    }

    pub fn run<R: Rng + ?Sized>(
        &self,
        name: &str,
        epsilon: f64,
        lambda: f64,
        data: &Dataset,
        rng: &mut R,
    ) -> Result<SimulationReport> {
        let _span = tracing::info_span!("simulation", name = %name).entered();
        let started = Instant::now();
        let n = data.len();
        if let Some(&too_big) = self.plan.num_samples.iter().find(|&&s| s >= n) {
            return Err(precondition(format!(
                "training sample size {} leaves no held-out rows out of {}",
                too_big, n
            )));
        }
        let selector = self.evaluator.selector();
        selector.validation_size(n)?;
        for &num_samples in &self.plan.num_samples {
            selector.validation_size(num_samples)?;
        }

        let full_sel = self.evaluator.full_information_hyperparameters(data, rng)?;
        let full_hp = full_sel.hyperparameters;
        let full_cost = self.evaluator.full_information_cost(data, &full_hp)?;

        let mut records = Vec::with_capacity(self.plan.num_samples.len() * self.plan.num_iterations);
        for &num_samples in &self.plan.num_samples {
            for iteration in 0..self.plan.num_iterations {
                tracing::info!(num_samples, iteration, "simulation step");

                let split = Split::with_train_size(n, num_samples, self.plan.mode, rng)?;
                let train = data.select(&split.train);
                let holdout = data.select(&split.holdout);

                let train_sel = self.evaluator.training_hyperparameters(&train, rng)?;
                let training_cost = self.evaluator.training_model_cost(
                    data,
                    &train,
                    &holdout,
                    &train_sel.hyperparameters,
                    &full_hp,
                )?;

                records.push(SimulationRecord {
                    num_samples,
                    iteration,
                    k_train: train_sel.hyperparameters.k(),
                    training_validation_error: train_sel.validation_error,
                    excess_cost: training_cost.mean_cost - full_cost.mean_cost,
                    training_cost,
                });
            }
        }

        let summaries = summarize(&records);
        tracing::info!(
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );

        Ok(SimulationReport {
            name: name.to_string(),
            epsilon,
            lambda,
            mode: self.plan.mode,
            samples: n,
            full_information: FullInformationSummary {
                k: full_hp.k(),
                validation_error: full_sel.validation_error,
                cost: full_cost,
            },
            records,
            summaries,
            generated_at: Utc::now(),
        })
    }
}

/// Group records by sample size and average them.
pub fn summarize(records: &[SimulationRecord]) -> Vec<SampleSizeSummary> {
    let mut groups: BTreeMap<usize, Vec<&SimulationRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.num_samples).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(num_samples, rs)| {
            let count = rs.len() as f64;
            SampleSizeSummary {
                num_samples,
                iterations: rs.len(),
                mean_k: rs.iter().map(|r| r.k_train as f64).sum::<f64>() / count,
                mean_training_cost: rs.iter().map(|r| r.training_cost.mean_cost).sum::<f64>()
                    / count,
                mean_excess_cost: rs.iter().map(|r| r.excess_cost).sum::<f64>() / count,
                skipped_contexts: rs.iter().map(|r| r.training_cost.skipped).sum(),
            }
        })
        .collect()
}
