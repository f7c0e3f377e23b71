use gpbox_gp::GpError;
use thiserror::Error;

use crate::DecisionMakerState;

/// A result type for decision making errors
pub type Result<T> = std::result::Result<T, BoError>;

/// An error for bayesian optimization decision making
#[derive(Error, Debug)]
pub enum BoError {
    /// When search space bounds are malformed or a sample count is invalid
    #[error("Invalid domain: {0}")]
    InvalidDomainError(String),
    /// When an argument or a configuration has a bad value
    #[error("Value error: {0}")]
    InvalidValueError(String),
    /// When array shapes are not compatible
    #[error("Dimension mismatch: {0}")]
    DimensionMismatchError(String),
    /// When the local optimizer of the acquisition function does not converge
    #[error("Optimisation failed: {0}")]
    OptimisationFailedError(String),
    /// When the black-box function evaluation fails
    #[error("Evaluation error: {0}")]
    EvaluationError(String),
    /// When posterior fitting, prediction or sampling fails
    #[error("GP error: {0}")]
    GpError(#[from] GpError),
    /// When an Argmin framework is raised
    #[error(transparent)]
    ArgminError(#[from] argmin::core::Error),
    /// When an iteration of the decision loop fails, the last consistent state is kept
    #[error("Iteration failed: {source}")]
    IterationFailed {
        /// Error raised by the iteration
        source: Box<BoError>,
        /// Last consistent state of the decision loop
        state: Box<DecisionMakerState>,
    },
}

impl BoError {
    /// Whether the error comes from a non finite fitting objective or gradient
    pub fn is_numerical_instability(&self) -> bool {
        match self {
            BoError::GpError(GpError::NumericalInstabilityError(_)) => true,
            BoError::IterationFailed { source, .. } => source.is_numerical_instability(),
            _ => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gp_error_message() {
        let err = BoError::from(GpError::NumericalInstabilityError(
            "marginal log likelihood value NaN".to_string(),
        ));
        assert!(err.is_numerical_instability());
        assert_eq!(
            err.to_string(),
            "GP error: Numerical instability: marginal log likelihood value NaN"
        );
        assert!(!BoError::EvaluationError("crash".to_string()).is_numerical_instability());
    }
}
