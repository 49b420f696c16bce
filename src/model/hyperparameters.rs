use std::fmt;
use std::sync::Arc;

use crate::error::{precondition, Result};
use crate::neighbors::smoother::Smoother;
use crate::neighbors::whitening::WhiteningTransform;

/// Neighbor count, smoother, bandwidth and the whitening transform they apply to.
///
/// Immutable once built. The transform is reference counted so a configuration
/// can be cloned into worker threads without copying the factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameters {
    k: usize,
    smoother: Smoother,
    bandwidth: f64,
    whitening: Arc<WhiteningTransform>,
}

impl Hyperparameters {
    pub fn new(
        k: usize,
        smoother: Smoother,
        bandwidth: f64,
        whitening: Arc<WhiteningTransform>,
    ) -> Result<Self> {
        if k == 0 {
            return Err(precondition("neighbor count k must be >= 1"));
        }
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(precondition(format!(
                "bandwidth must be positive and finite, got {}",
                bandwidth
            )));
        }
        smoother.ensure_implemented()?;
        Ok(Self {
            k,
            smoother,
            bandwidth,
            whitening,
        })
    }

    /// Naive smoother with unit bandwidth.
    pub fn naive(k: usize, whitening: Arc<WhiteningTransform>) -> Result<Self> {
        Self::new(k, Smoother::Naive, 1.0, whitening)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn smoother(&self) -> Smoother {
        self.smoother
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn whitening(&self) -> &WhiteningTransform {
        &self.whitening
    }

    pub fn whitening_arc(&self) -> &Arc<WhiteningTransform> {
        &self.whitening
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "k={} smoother={} bandwidth={}",
            self.k, self.smoother, self.bandwidth
        )
    }
}
