use nn_portfolio::config::Config;
use nn_portfolio::evaluation::NonOptimalPolicy;
use nn_portfolio::model::SplitMode;
use nn_portfolio::neighbors::Smoother;

#[test]
fn parse_default_toml() {
    let toml_str = r#"
[model]
name = "nn-cvar"
epsilon = 0.05
lambda = 2.5
validation_fraction = 0.25
smoothers = ["Naive"]

[simulation]
x_csv = "data/x.csv"
y_csv = "data/y.csv"
delimiter = ";"
num_samples = [50, 100, 200]
num_iterations = 10
sanity = true
seed = 42
parallel = true
non_optimal_policy = "skip"
report_path = "reports/run.json"

[solver]
max_iter = 500
time_limit_secs = 2.5
verbose = false

[logging]
level = "debug"
json = true
file = "nn-portfolio.log"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.model.name, "nn-cvar");
    assert!((config.model.epsilon - 0.05).abs() < f64::EPSILON);
    assert!((config.model.lambda - 2.5).abs() < f64::EPSILON);
    assert!((config.model.validation_fraction - 0.25).abs() < f64::EPSILON);
    assert_eq!(config.model.smoothers, vec![Smoother::Naive]);
    assert_eq!(config.simulation.delimiter, ';');
    assert_eq!(config.simulation.num_samples, vec![50, 100, 200]);
    assert_eq!(config.simulation.num_iterations, 10);
    assert_eq!(config.simulation.split_mode(), SplitMode::Deterministic);
    assert_eq!(config.simulation.seed, Some(42));
    assert!(config.simulation.parallel);
    assert_eq!(config.simulation.non_optimal_policy, NonOptimalPolicy::Skip);
    assert_eq!(
        config.simulation.report_path.as_deref(),
        Some(std::path::Path::new("reports/run.json"))
    );
    assert_eq!(config.solver.max_iter, 500);
    assert_eq!(config.solver.time_limit_secs, Some(2.5));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn shipped_default_config_is_valid() {
    let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
        .expect("config/default.toml should exist");
    let config = Config::from_toml_str(&text).expect("shipped config should validate");
    assert!(!config.simulation.num_samples.is_empty());
}

#[test]
fn named_but_unimplemented_smoother_still_parses() {
    let toml_str = r#"
[model]
epsilon = 0.1
lambda = 0.0
smoothers = ["Naive", "Gaussian"]

[simulation]
x_csv = "x"
y_csv = "y"
num_samples = [10]
num_iterations = 1
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.model.smoothers, vec![Smoother::Naive, Smoother::Gaussian]);
}

#[test]
fn rejects_out_of_range_values() {
    let base = r#"
[model]
epsilon = 0.1
lambda = 0.0
validation_fraction = VF

[simulation]
x_csv = "x"
y_csv = "y"
num_samples = SAMPLES
num_iterations = 1
"#;
    let case = |vf: &str, samples: &str| {
        Config::from_toml_str(&base.replace("VF", vf).replace("SAMPLES", samples))
    };
    assert!(case("0.2", "[10]").is_ok());
    assert!(case("0.0", "[10]").is_err());
    assert!(case("1.0", "[10]").is_err());
    assert!(case("0.2", "[]").is_err());
    assert!(case("0.2", "[0, 10]").is_err());
}

#[test]
fn unknown_policy_fails_to_parse() {
    let toml_str = r#"
[model]
epsilon = 0.1
lambda = 0.0

[simulation]
x_csv = "x"
y_csv = "y"
num_samples = [10]
num_iterations = 1
non_optimal_policy = "retry"
"#;
    assert!(Config::from_toml_str(toml_str).is_err());
}
