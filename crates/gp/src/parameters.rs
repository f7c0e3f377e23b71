use crate::errors::{GpError, Result};
use linfa::ParamGuard;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default number of Adam iterations when fitting GP hyperparameters
pub const GP_ADAM_N_ITERS: usize = 100;
/// Default Adam learning rate
pub const GP_ADAM_LEARNING_RATE: f64 = 0.05;

/// A set of validated fitting parameters.
///
/// GP hyperparameters are fitted by running exactly `n_iters` Adam steps on the
/// training objective in the unconstrained parameter space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct FitValidParams {
    /// Number of optimizer iterations
    pub(crate) n_iters: usize,
    /// Step size
    pub(crate) learning_rate: f64,
    /// Exponential decay rate of the first moment estimates
    pub(crate) beta1: f64,
    /// Exponential decay rate of the second moment estimates
    pub(crate) beta2: f64,
    /// Denominator stabilizer
    pub(crate) epsilon: f64,
}

impl Default for FitValidParams {
    fn default() -> FitValidParams {
        FitValidParams {
            n_iters: GP_ADAM_N_ITERS,
            learning_rate: GP_ADAM_LEARNING_RATE,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl FitValidParams {
    /// Get the number of optimizer iterations
    pub fn n_iters(&self) -> usize {
        self.n_iters
    }

    /// Get the learning rate
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Get the first moment decay rate
    pub fn beta1(&self) -> f64 {
        self.beta1
    }

    /// Get the second moment decay rate
    pub fn beta2(&self) -> f64 {
        self.beta2
    }

    /// Get the denominator stabilizer
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

#[derive(Clone, Debug, Default)]
/// The set of parameters that can be specified for fitting GP hyperparameters
/// with [`Posterior::fit`](crate::Posterior::fit).
pub struct FitParams(FitValidParams);

impl FitParams {
    /// A constructor for fitting parameters with default values
    pub fn new() -> FitParams {
        Self(FitValidParams::default())
    }

    /// A constructor for fitting parameters from validated parameters
    pub fn new_from_valid(params: &FitValidParams) -> Self {
        Self(params.clone())
    }

    /// Set the number of optimizer iterations, 0 keeps the current hyperparameters
    pub fn n_iters(mut self, n_iters: usize) -> Self {
        self.0.n_iters = n_iters;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }

    /// Set the moment decay rates
    pub fn betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.0.beta1 = beta1;
        self.0.beta2 = beta2;
        self
    }

    /// Set the denominator stabilizer
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.0.epsilon = epsilon;
        self
    }
}

impl From<FitValidParams> for FitParams {
    fn from(valid: FitValidParams) -> Self {
        FitParams(valid)
    }
}

impl ParamGuard for FitParams {
    type Checked = FitValidParams;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        if !(p.learning_rate.is_finite() && p.learning_rate > 0.) {
            return Err(GpError::InvalidValueError(format!(
                "learning rate should be positive, got {}",
                p.learning_rate
            )));
        }
        for (name, beta) in [("beta1", p.beta1), ("beta2", p.beta2)] {
            if !(0. ..1.).contains(&beta) {
                return Err(GpError::InvalidValueError(format!(
                    "{name} should be in [0, 1), got {beta}"
                )));
            }
        }
        if p.epsilon.is_nan() || p.epsilon <= 0. {
            return Err(GpError::InvalidValueError(format!(
                "epsilon should be positive, got {}",
                p.epsilon
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_params_check() {
        let valid = FitParams::new().n_iters(10).check().unwrap();
        assert_eq!(valid.n_iters(), 10);
        assert_eq!(valid.beta2(), 0.999);

        assert!(FitParams::new().learning_rate(0.).check().is_err());
        assert!(FitParams::new().betas(0.9, 1.).check().is_err());
        assert!(FitParams::new().epsilon(-1.).check().is_err());
    }
}
