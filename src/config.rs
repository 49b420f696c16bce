use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::evaluation::NonOptimalPolicy;
use crate::model::split::SplitMode;
use crate::neighbors::smoother::Smoother;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "NN_PORTFOLIO_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub epsilon: f64,
    pub lambda: f64,
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,
    #[serde(default = "default_smoothers")]
    pub smoothers: Vec<Smoother>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub x_csv: PathBuf,
    pub y_csv: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    pub num_samples: Vec<usize>,
    pub num_iterations: usize,
    /// Deterministic splits (leading rows) instead of random draws.
    #[serde(default)]
    pub sanity: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub non_optimal_policy: NonOptimalPolicy,
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            time_limit_secs: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_model_name() -> String {
    "nn-portfolio".to_string()
}

fn default_validation_fraction() -> f64 {
    crate::selector::DEFAULT_VALIDATION_FRACTION
}

fn default_smoothers() -> Vec<Smoother> {
    vec![Smoother::Naive]
}

fn default_delimiter() -> char {
    ','
}

fn default_max_iter() -> u32 {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SimulationConfig {
    pub fn split_mode(&self) -> SplitMode {
        if self.sanity {
            SplitMode::Deterministic
        } else {
            SplitMode::Random
        }
    }
}

impl Config {
    /// Load configuration from `path`, else `$NN_PORTFOLIO_CONFIG`, else
    /// `config/default.toml`. A `.env` file is read first if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var_os(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid config {}", config_path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let eps = self.model.epsilon;
        if eps.is_nan() || eps <= 0.0 || eps >= 1.0 {
            bail!("model.epsilon must be in (0, 1), got {}", eps);
        }
        if !self.model.lambda.is_finite() {
            bail!("model.lambda must be finite, got {}", self.model.lambda);
        }
        let p = self.model.validation_fraction;
        if p.is_nan() || p <= 0.0 || p >= 1.0 {
            bail!("model.validation_fraction must be in (0, 1), got {}", p);
        }
        if self.model.smoothers.is_empty() {
            bail!("model.smoothers must name at least one smoother");
        }
        if self.simulation.num_samples.is_empty() {
            bail!("simulation.num_samples must not be empty");
        }
        if self.simulation.num_samples.contains(&0) {
            bail!("simulation.num_samples entries must be > 0");
        }
        if self.simulation.num_iterations == 0 {
            bail!("simulation.num_iterations must be > 0");
        }
        if let Some(limit) = self.solver.time_limit_secs {
            if limit.is_nan() || limit <= 0.0 {
                bail!("solver.time_limit_secs must be > 0, got {}", limit);
            }
        }
        Ok(())
    }
}
