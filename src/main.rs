use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use nn_portfolio::config::{Config, LoggingConfig};
use nn_portfolio::evaluation::Evaluator;
use nn_portfolio::loader::load_dataset;
use nn_portfolio::portfolio::NearestNeighborsPortfolio;
use nn_portfolio::selector::HyperparameterSelector;
use nn_portfolio::simulation::{SimulationPlan, SimulationReport, SimulationRunner};
use nn_portfolio::solver::ClarabelSolver;

#[derive(Parser)]
#[command(name = "nn-portfolio")]
#[command(version, about = "Compare full-information and training-only nearest-neighbor CVaR portfolios")]
struct Cli {
    /// Config file (defaults to $NN_PORTFOLIO_CONFIG, then config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deterministic splits on leading rows
    #[arg(long)]
    sanity: bool,

    /// Seed for random splits
    #[arg(long)]
    seed: Option<u64>,

    /// Write the JSON report here (overrides simulation.report_path)
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });

    let (writer, ansi) = match &logging.file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(log_file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if logging.json {
        builder.with_ansi(false).json().init();
    } else {
        builder.with_ansi(ansi).init();
    }
    Ok(())
}

fn print_summary(report: &SimulationReport) {
    let full = &report.full_information;
    println!(
        "{} (epsilon={}, lambda={}, samples={}, mode={:?})",
        report.name, report.epsilon, report.lambda, report.samples, report.mode
    );
    println!(
        "full information: k={} cost={:.6} skipped={}",
        full.k, full.cost.mean_cost, full.cost.skipped
    );
    println!(
        "{:>10} {:>6} {:>8} {:>14} {:>14} {:>8}",
        "samples", "iters", "mean_k", "train_cost", "excess_cost", "skipped"
    );
    for s in &report.summaries {
        println!(
            "{:>10} {:>6} {:>8.2} {:>14.6} {:>14.6} {:>8}",
            s.num_samples,
            s.iterations,
            s.mean_k,
            s.mean_training_cost,
            s.mean_excess_cost,
            s.skipped_contexts
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };
    if cli.sanity {
        config.simulation.sanity = true;
    }
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }

    init_tracing(&config.logging)?;

    let sim = &config.simulation;
    let mode = sim.split_mode();
    tracing::info!(
        name = %config.model.name,
        epsilon = config.model.epsilon,
        lambda = config.model.lambda,
        mode = ?mode,
        seed = ?sim.seed,
        "Starting nn-portfolio"
    );

    let data = load_dataset(&sim.x_csv, &sim.y_csv, sim.delimiter)
        .context("failed to load dataset")?;

    let learner = NearestNeighborsPortfolio::new(
        config.model.name.clone(),
        config.model.epsilon,
        config.model.lambda,
        ClarabelSolver::from_config(&config.solver),
    )?;
    let selector = HyperparameterSelector::new(
        config.model.validation_fraction,
        config.model.smoothers.clone(),
        mode,
    )?;
    let evaluator = Evaluator::new(&learner, &selector)
        .with_policy(sim.non_optimal_policy)
        .with_parallel(sim.parallel);
    let plan = SimulationPlan::new(sim.num_samples.clone(), sim.num_iterations, mode)?;

    let mut rng = match sim.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = SimulationRunner::new(evaluator, plan).run(
        learner.name(),
        learner.epsilon(),
        learner.lambda(),
        &data,
        &mut rng,
    )?;

    print_summary(&report);

    if let Some(path) = cli.report.as_ref().or(sim.report_path.as_ref()) {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
        println!("report: {}", path.display());
    }

    Ok(())
}
