use thiserror::Error;

/// A result type for gaussian process modeling
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when building, fitting or sampling a [`Posterior`](crate::Posterior)
#[derive(Error, Debug)]
pub enum GpError {
    /// When array shapes are not compatible (dataset concatenation, prediction inputs, ...)
    #[error("Dimension mismatch: {0}")]
    DimensionMismatchError(String),
    /// When an argument has a bad value (non positive counts, ...)
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When the training objective or one of its gradient components is not finite
    #[error("Numerical instability: {0}")]
    NumericalInstabilityError(String),
    /// When an operation is not available for the given posterior kind
    #[error("Not supported: {0}")]
    NotSupportedError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
