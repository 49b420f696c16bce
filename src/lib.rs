pub mod config;
pub mod error;
pub mod estimator;
pub mod evaluation;
pub mod loader;
pub mod model;
pub mod neighbors;
pub mod portfolio;
pub mod selector;
pub mod simulation;
pub mod solver;

pub use error::{PortfolioError, Result};
