use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use nn_portfolio::neighbors::WhiteningTransform;
use nn_portfolio::PortfolioError;

fn sample() -> DMatrix<f64> {
    DMatrix::from_row_slice(
        6,
        2,
        &[
            0.0, 1.0, //
            1.0, 0.5, //
            2.0, 2.5, //
            3.0, 1.5, //
            4.0, 4.0, //
            5.0, 3.0,
        ],
    )
}

#[test]
fn refitting_same_sample_gives_identical_distances() {
    let x = sample();
    let a = WhiteningTransform::fit(&x).expect("fit should succeed");
    let b = WhiteningTransform::fit(&x).expect("fit should succeed");
    let query = [2.2, 1.9];
    let da = a.distances(&x, &query).expect("distances should succeed");
    let db = b.distances(&x, &query).expect("distances should succeed");
    assert_eq!(da, db);
}

#[test]
fn distance_is_symmetric_and_zero_on_diagonal() {
    let x = sample();
    let t = WhiteningTransform::fit(&x).expect("fit should succeed");
    let p = [1.0, 0.5];
    let q = [4.0, 4.0];
    assert_abs_diff_eq!(t.distance(&p, &q), t.distance(&q, &p), epsilon = 1e-12);
    assert_abs_diff_eq!(t.distance(&p, &p), 0.0, epsilon = 1e-15);
}

/// In one dimension the whitened distance is |p - q| / sqrt(var + 1/N).
#[test]
fn one_dimensional_distance_uses_population_variance_plus_ridge() {
    let x = DMatrix::from_row_slice(5, 1, &[0.0, 2.0, 4.0, 6.0, 8.0]);
    let t = WhiteningTransform::fit(&x).expect("fit should succeed");
    // population variance 8, ridge 1/5
    assert_abs_diff_eq!(t.distance(&[0.0], &[8.0]), 8.0 / 8.2_f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn constant_column_is_rescued_by_ridge() {
    let x = DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0]);
    let t = WhiteningTransform::fit(&x).expect("ridge keeps covariance positive definite");
    assert_eq!(t.dimension(), 2);
    assert_eq!(t.sample_size(), 4);
}

#[test]
fn dimension_mismatch_is_a_precondition_error() {
    let x = sample();
    let t = WhiteningTransform::fit(&x).expect("fit should succeed");
    let err = t.distances(&x, &[1.0]).expect_err("1-d query must be rejected");
    assert!(matches!(err, PortfolioError::Precondition(_)));
}

#[test]
fn non_finite_covariates_are_rejected() {
    let x = DMatrix::from_row_slice(3, 1, &[0.0, f64::NAN, 2.0]);
    assert!(matches!(
        WhiteningTransform::fit(&x),
        Err(PortfolioError::Precondition(_))
    ));
}
