use nn_portfolio::model::{Dataset, SplitMode};
use nn_portfolio::neighbors::Smoother;
use nn_portfolio::selector::{candidate_k_values, HyperparameterSelector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noisy_line(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let xs: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / n as f64]).collect();
    let ys: Vec<Vec<f64>> = xs
        .iter()
        .map(|x| vec![x[0] + rng.gen_range(-0.05..0.05), 1.0 - x[0]])
        .collect();
    Dataset::from_rows(&xs, &ys).expect("dataset should be valid")
}

#[test]
fn deterministic_mode_ignores_the_rng() {
    let data = noisy_line(50, 1);
    let selector = HyperparameterSelector::new(0.2, vec![Smoother::Naive], SplitMode::Deterministic)
        .expect("selector should be valid");

    let a = selector
        .select(&data, &mut StdRng::seed_from_u64(1))
        .expect("select should succeed");
    let b = selector
        .select(&data, &mut StdRng::seed_from_u64(999))
        .expect("select should succeed");

    assert_eq!(a.hyperparameters.k(), b.hyperparameters.k());
    assert_eq!(a.validation_error, b.validation_error);
    assert_eq!(a.validation_size, 10);
    assert_eq!(a.train_size, 40);
}

#[test]
fn random_mode_is_reproducible_from_seed() {
    let data = noisy_line(60, 2);
    let selector = HyperparameterSelector::default();
    let a = selector
        .select(&data, &mut StdRng::seed_from_u64(5))
        .expect("select should succeed");
    let b = selector
        .select(&data, &mut StdRng::seed_from_u64(5))
        .expect("select should succeed");
    assert_eq!(a.hyperparameters, b.hyperparameters);
    assert_eq!(a.validation_error, b.validation_error);
}

#[test]
fn chosen_k_comes_from_training_grid() {
    let data = noisy_line(50, 3);
    let selector = HyperparameterSelector::new(0.2, vec![Smoother::Naive], SplitMode::Deterministic)
        .expect("selector should be valid");
    let sel = selector
        .select(&data, &mut StdRng::seed_from_u64(0))
        .expect("select should succeed");

    let grid = candidate_k_values(sel.train_size).expect("grid should exist");
    assert!(grid.contains(&sel.hyperparameters.k()));
    assert_eq!(sel.candidates_evaluated, grid.len());
    assert!(sel.validation_error >= 0.0);
}

/// Validation size uses round-half-to-even: 0.25 * 10 = 2.5 rounds to 2.
#[test]
fn validation_size_rounds_half_to_even() {
    let data = noisy_line(10, 4);
    let selector = HyperparameterSelector::new(0.25, vec![Smoother::Naive], SplitMode::Deterministic)
        .expect("selector should be valid");
    let sel = selector
        .select(&data, &mut StdRng::seed_from_u64(0))
        .expect("select should succeed");
    assert_eq!(sel.validation_size, 2);
    assert_eq!(sel.train_size, 8);
}

#[test]
fn empty_validation_split_is_rejected() {
    let data = noisy_line(2, 5);
    let selector = HyperparameterSelector::default();
    assert!(selector
        .select(&data, &mut StdRng::seed_from_u64(0))
        .is_err());
}

#[test]
fn k_grid_is_sorted_unique_and_in_range() {
    for n in [1, 2, 3, 10, 37, 250, 1000] {
        let ks = candidate_k_values(n).expect("grid should exist");
        assert!(!ks.is_empty());
        assert!(ks.windows(2).all(|w| w[0] < w[1]), "n={} grid {:?}", n, ks);
        assert!(ks.iter().all(|&k| k >= 1 && k <= n), "n={} grid {:?}", n, ks);
    }
}

#[test]
fn whitening_is_fitted_on_training_rows_only() {
    let data = noisy_line(50, 6);
    let selector = HyperparameterSelector::new(0.2, vec![Smoother::Naive], SplitMode::Deterministic)
        .expect("selector should be valid");
    let sel = selector
        .select(&data, &mut StdRng::seed_from_u64(0))
        .expect("select should succeed");

    assert_eq!(sel.train_size, 40);
    assert_eq!(sel.hyperparameters.whitening().sample_size(), 40);
}

/// With constant responses every candidate scores exactly zero, so the
/// strict-improvement rule keeps the smallest k.
#[test]
fn ties_keep_first_candidate_in_grid_order() {
    let xs: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 7) as f64]).collect();
    let ys: Vec<Vec<f64>> = (0..60).map(|_| vec![1.0, 0.5]).collect();
    let data = Dataset::from_rows(&xs, &ys).expect("dataset should be valid");
    let selector = HyperparameterSelector::default();
    let sel = selector
        .select(&data, &mut StdRng::seed_from_u64(8))
        .expect("select should succeed");

    let grid = candidate_k_values(sel.train_size).expect("grid should exist");
    assert!(grid.len() > 1);
    assert_eq!(sel.validation_error, 0.0);
    assert_eq!(sel.hyperparameters.k(), grid[0]);
}
