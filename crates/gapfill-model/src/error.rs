use thiserror::Error;

/// Errors raised while building imputation configuration.
#[derive(Debug, Error)]
pub enum GapfillError {
    /// A method name that is not one of the six supported fill methods.
    /// There is no safe default fill, so this aborts configuration loading.
    #[error("unknown imputation method `{0}`")]
    UnknownMethod(String),

    /// A flag cell that could not be read as a boolean.
    #[error("invalid boolean value `{value}` for `{field}`")]
    InvalidFlag { field: String, value: String },

    /// Settings that are structurally valid but unusable for a run.
    #[error("incomplete imputation settings: {0}")]
    IncompleteSettings(String),
}

pub type Result<T> = std::result::Result<T, GapfillError>;
