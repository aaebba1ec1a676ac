//! Error types for the imputation engine.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that abort an imputation run.
///
/// Data-quality problems (insufficient donors, unreadable filters, missing
/// metadata) never surface here; they are recovered per column or per stratum
/// and reported through logging and the run report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A configured index key or grouping dimension is not a table column.
    #[error("column `{name}` is not present in the table")]
    MissingColumn { name: String },

    /// An internal table operation failed.
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
