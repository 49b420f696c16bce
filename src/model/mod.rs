pub mod dataset;
pub mod hyperparameters;
pub mod solution;
pub mod split;

pub use dataset::Dataset;
pub use hyperparameters::Hyperparameters;
pub use solution::PortfolioSolution;
pub use split::{Split, SplitMode};
