use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Kernel mapping a bandwidth-normalized distance to a neighbor weight.
///
/// Only `Naive` is implemented. The remaining variants are accepted by the
/// configuration layer so they can be named in a grid, but any attempt to
/// evaluate them fails with [`PortfolioError::UnsupportedSmoother`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Smoother {
    /// Equal weight for every point in the inclusive neighbor set.
    #[default]
    Naive,
    Gaussian,
    Epanechnikov,
    Tricube,
    Uniform,
}

impl Smoother {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Naive => "Naive",
            Self::Gaussian => "Gaussian",
            Self::Epanechnikov => "Epanechnikov",
            Self::Tricube => "Tricube",
            Self::Uniform => "Uniform",
        }
    }

    pub fn is_implemented(self) -> bool {
        matches!(self, Self::Naive)
    }

    /// Fail fast when the smoother has no weighting rule.
    pub fn ensure_implemented(self) -> Result<()> {
        if self.is_implemented() {
            Ok(())
        } else {
            Err(PortfolioError::UnsupportedSmoother(self))
        }
    }

    /// Weight for a distance already divided by the bandwidth.
    pub fn weight(self, scaled_distance: f64) -> Result<f64> {
        match self {
            Self::Naive if scaled_distance.is_nan() => Err(PortfolioError::Precondition(
                "neighbor distance is NaN".to_string(),
            )),
            Self::Naive => Ok(1.0),
            other => Err(PortfolioError::UnsupportedSmoother(other)),
        }
    }

    /// Bandwidths searched for this smoother during hyperparameter selection.
    ///
    /// The naive kernel ignores the bandwidth, so a single placeholder is enough.
    pub fn bandwidth_grid(self) -> Result<Vec<f64>> {
        match self {
            Self::Naive => Ok(vec![1.0]),
            other => Err(PortfolioError::UnsupportedSmoother(other)),
        }
    }
}

impl fmt::Display for Smoother {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Smoother {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "gaussian" => Ok(Self::Gaussian),
            "epanechnikov" => Ok(Self::Epanechnikov),
            "tricube" => Ok(Self::Tricube),
            "uniform" => Ok(Self::Uniform),
            _ => Err(PortfolioError::Precondition(format!(
                "unknown smoother '{}'",
                s
            ))),
        }
    }
}
