//! Immutable configuration attached to a [`Prior`](crate::Prior) at construction
//! and carried along by the posteriors built from it.

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A bijection between the real line and a constrained parameter domain.
///
/// Parameters are optimized in the unconstrained space: `inverse` maps a constrained
/// value to the real line, `forward` maps it back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Bijector {
    /// No transformation
    Identity,
    /// `log(1 + exp(x))` onto the positive reals
    #[default]
    Softplus,
    /// `exp(x)` onto the positive reals
    Exp,
}

const SOFTPLUS_LINEAR_THRESHOLD: f64 = 30.;

impl Bijector {
    /// Maps an unconstrained value to the constrained domain
    pub fn forward(&self, x: f64) -> f64 {
        match self {
            Bijector::Identity => x,
            Bijector::Softplus => {
                if x > SOFTPLUS_LINEAR_THRESHOLD {
                    x
                } else {
                    x.exp().ln_1p()
                }
            }
            Bijector::Exp => x.exp(),
        }
    }

    /// Maps a constrained value to the unconstrained real line
    pub fn inverse(&self, y: f64) -> f64 {
        match self {
            Bijector::Identity => y,
            Bijector::Softplus => {
                if y > SOFTPLUS_LINEAR_THRESHOLD {
                    y
                } else {
                    y.exp_m1().ln()
                }
            }
            Bijector::Exp => y.ln(),
        }
    }
}

/// Gaussian process configuration
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GpConfig {
    jitter: f64,
    positive_transform: Bijector,
}

impl Default for GpConfig {
    fn default() -> Self {
        GpConfig {
            jitter: 1e-6,
            positive_transform: Bijector::Softplus,
        }
    }
}

impl GpConfig {
    /// Small positive value added to covariance diagonals before factorization
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Transform used for positive parameters (lengthscales, variances, noise)
    pub fn positive_transform(&self) -> Bijector {
        self.positive_transform
    }

    /// Set the jitter value
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the transform used for positive parameters
    pub fn with_positive_transform(mut self, bijector: Bijector) -> Self {
        self.positive_transform = bijector;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bijectors_roundtrip() {
        for bij in [Bijector::Identity, Bijector::Softplus, Bijector::Exp] {
            for y in [1e-3, 0.5, 1., 10., 50.] {
                assert_abs_diff_eq!(bij.forward(bij.inverse(y)), y, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_softplus_is_positive() {
        for x in [-50., -1., 0., 1., 50.] {
            assert!(Bijector::Softplus.forward(x) > 0.);
        }
        assert_abs_diff_eq!(Bijector::Softplus.forward(0.), 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_config_is_not_shared() {
        let default = GpConfig::default();
        let cfg = default.with_jitter(1e-3).with_positive_transform(Bijector::Exp);
        assert_eq!(cfg.jitter(), 1e-3);
        assert_eq!(cfg.positive_transform(), Bijector::Exp);
        assert_eq!(GpConfig::default().jitter(), 1e-6);
        assert_eq!(default.positive_transform(), Bijector::Softplus);
    }
}
