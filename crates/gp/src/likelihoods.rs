use crate::utils::norm_cdf;
use ndarray::{Array1, ArrayView1, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Observation models linking the latent GP function to observed values
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Likelihood {
    /// Gaussian observation noise `y = f(x) + e` with `e ~ N(0, obs_noise)`
    Gaussian {
        /// Noise variance
        obs_noise: f64,
        /// Whether the noise variance is fitted along with the kernel parameters
        trainable: bool,
    },
    /// Binary observations `y` in {0, 1} with `P(y = 1) = Phi(f(x))` (probit link)
    Bernoulli,
}

impl Likelihood {
    /// Gaussian likelihood with a trainable noise variance
    pub fn gaussian(obs_noise: f64) -> Self {
        Likelihood::Gaussian {
            obs_noise,
            trainable: true,
        }
    }

    /// Gaussian likelihood with a fixed noise variance
    pub fn gaussian_fixed(obs_noise: f64) -> Self {
        Likelihood::Gaussian {
            obs_noise,
            trainable: false,
        }
    }

    /// Whether the posterior of a GP prior under this likelihood is available in closed form
    pub fn is_conjugate(&self) -> bool {
        matches!(self, Likelihood::Gaussian { .. })
    }

    /// Log density of the observations `y` given latent values `f`
    pub fn log_prob(&self, y: &ArrayView1<f64>, f: &ArrayView1<f64>) -> f64 {
        match self {
            Likelihood::Gaussian { obs_noise, .. } => {
                let c = -0.5 * (2. * std::f64::consts::PI * obs_noise).ln();
                Zip::from(y)
                    .and(f)
                    .fold(0., |acc, y, f| acc + c - 0.5 * (y - f).powi(2) / obs_noise)
            }
            Likelihood::Bernoulli => Zip::from(y).and(f).fold(0., |acc, y, f| {
                let signed = if *y > 0.5 { *f } else { -*f };
                acc + norm_cdf(signed).max(f64::MIN_POSITIVE).ln()
            }),
        }
    }

    /// Predictive mean of observations given the latent predictive mean and variance
    pub fn predictive_mean(&self, mean: &Array1<f64>, variance: &Array1<f64>) -> Array1<f64> {
        match self {
            Likelihood::Gaussian { .. } => mean.to_owned(),
            Likelihood::Bernoulli => {
                Zip::from(mean)
                    .and(variance)
                    .map_collect(|m, v| norm_cdf(m / (1. + v).sqrt()))
            }
        }
    }
}
