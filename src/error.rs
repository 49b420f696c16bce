use thiserror::Error;

use crate::neighbors::smoother::Smoother;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("smoother '{0}' is not implemented")]
    UnsupportedSmoother(Smoother),

    #[error("parse error in {source_name} (line {line}): {msg}")]
    Parse {
        source_name: String,
        line: usize,
        msg: String,
    },

    #[error("solver returned '{status}' for context {context}")]
    NonOptimal { context: usize, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Shorthand for building a [`PortfolioError::Precondition`].
pub(crate) fn precondition(msg: impl Into<String>) -> PortfolioError {
    PortfolioError::Precondition(msg.into())
}
