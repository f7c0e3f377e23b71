use crate::config::GpConfig;
use crate::errors::Result;
use crate::kernels::{Kernel, Rbf};
use crate::mean_functions::{MeanFunction, ZeroMean};
use crate::sample::SampleFunction;
use crate::Key;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Gaussian distribution of the latent function values at a set of query points
#[derive(Clone, Debug, PartialEq)]
pub struct Predictive {
    /// Mean vector (n,)
    pub mean: Array1<f64>,
    /// Covariance matrix (n, n)
    pub covariance: Array2<f64>,
}

impl Predictive {
    /// Marginal variances, negative values due to round-off are clipped to zero
    pub fn variance(&self) -> Array1<f64> {
        self.covariance.diag().mapv(|v| v.max(0.))
    }

    /// Marginal standard deviations
    pub fn stddev(&self) -> Array1<f64> {
        self.variance().mapv(f64::sqrt)
    }
}

/// A GP prior given as a mean function and a covariance kernel
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Prior {
    mean: Box<dyn MeanFunction>,
    kernel: Box<dyn Kernel>,
    config: GpConfig,
}

impl Default for Prior {
    fn default() -> Self {
        Prior::new(Box::new(ZeroMean), Box::new(Rbf::default()))
    }
}

impl Prior {
    /// Prior with the given mean function and kernel and a default configuration
    pub fn new(mean: Box<dyn MeanFunction>, kernel: Box<dyn Kernel>) -> Self {
        Prior {
            mean,
            kernel,
            config: GpConfig::default(),
        }
    }

    /// Attach a configuration
    pub fn with_config(mut self, config: GpConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn with_jitter(self, jitter: f64) -> Self {
        let config = self.config.with_jitter(jitter);
        self.with_config(config)
    }

    /// Set the covariance kernel
    pub fn with_kernel(mut self, kernel: Box<dyn Kernel>) -> Self {
        self.kernel = kernel;
        self
    }

    /// Mean function
    pub fn mean(&self) -> &dyn MeanFunction {
        self.mean.as_ref()
    }

    /// Covariance kernel
    pub fn kernel(&self) -> &dyn Kernel {
        self.kernel.as_ref()
    }

    pub(crate) fn boxed_mean(&self) -> Box<dyn MeanFunction> {
        self.mean.clone()
    }

    pub(crate) fn boxed_kernel(&self) -> Box<dyn Kernel> {
        self.kernel.clone()
    }

    /// Configuration
    pub fn config(&self) -> &GpConfig {
        &self.config
    }

    /// Prior distribution of the function values at `x` points
    pub fn predict(&self, x: &ArrayView2<f64>) -> Result<Predictive> {
        Ok(Predictive {
            mean: self.mean.value(x),
            covariance: self.kernel.gram(x)?,
        })
    }

    /// Approximate sample paths of the prior for `in_dim`-dimensional inputs drawn
    /// with `num_features` random Fourier features.
    ///
    /// The `num_samples` paths are evaluated together, one column per path.
    /// Fails with [`GpError::InvalidValueError`](crate::GpError::InvalidValueError)
    /// when `num_samples` or `num_features` is zero.
    pub fn sample_approx(
        &self,
        in_dim: usize,
        num_samples: usize,
        key: Key,
        num_features: usize,
    ) -> Result<SampleFunction> {
        SampleFunction::from_prior(self, in_dim, num_samples, key, num_features)
    }

    /// Number of trainable parameters
    pub(crate) fn n_params(&self) -> usize {
        self.kernel.lengthscale().len() + 1 + self.mean.params().len()
    }

    /// Trainable parameters mapped to the unconstrained space:
    /// lengthscales, variance then mean parameters
    pub(crate) fn unconstrained_params(&self) -> Vec<f64> {
        let bij = self.config.positive_transform();
        let mut theta: Vec<f64> = self
            .kernel
            .lengthscale()
            .iter()
            .map(|l| bij.inverse(*l))
            .collect();
        theta.push(bij.inverse(self.kernel.variance()));
        theta.extend(self.mean.params().iter());
        theta
    }

    /// Prior built from trainable parameters in the unconstrained space,
    /// `theta` starts with the [`Prior::n_params`] prior parameters
    pub(crate) fn from_unconstrained(&self, theta: &ArrayView1<f64>) -> Prior {
        let bij = self.config.positive_transform();
        let n_ls = self.kernel.lengthscale().len();
        let n_mean = self.mean.params().len();
        let lengthscale = theta.slice(ndarray::s![..n_ls]).mapv(|v| bij.forward(v));
        let variance = bij.forward(theta[n_ls]);
        let mut prior = self.clone();
        prior.kernel.set_hyperparameters(lengthscale, variance);
        prior
            .mean
            .set_params(&theta.slice(ndarray::s![n_ls + 1..n_ls + 1 + n_mean]));
        prior
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Matern32;
    use crate::mean_functions::ConstantMean;
    use crate::Bijector;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, Axis};

    #[test]
    fn test_prior_predict() {
        let prior = Prior::new(Box::new(ConstantMean::new(1.)), Box::new(Rbf::new(1., 2.)));
        let x = array![[0.], [1.]];
        let pred = prior.predict(&x.view()).unwrap();
        assert_eq!(pred.mean, array![1., 1.]);
        assert_abs_diff_eq!(pred.variance(), array![2., 2.], epsilon = 1e-12);
        assert_abs_diff_eq!(pred.covariance[[0, 1]], 2. * (-0.5f64).exp(), epsilon = 1e-12);

        let prior = prior.with_kernel(Box::new(Rbf::new(1., 3.)));
        let pred = prior.predict(&x.view()).unwrap();
        assert_abs_diff_eq!(pred.variance(), array![3., 3.], epsilon = 1e-12);
    }

    #[test]
    fn test_unconstrained_roundtrip() {
        let prior = Prior::new(
            Box::new(ConstantMean::new(-0.3)),
            Box::new(Matern32::ard(array![0.5, 2.], 1.5)),
        )
        .with_config(GpConfig::default().with_positive_transform(Bijector::Exp));
        assert_eq!(prior.n_params(), 4);
        let theta = Array1::from(prior.unconstrained_params());
        assert_abs_diff_eq!(theta[2], 1.5f64.ln(), epsilon = 1e-12);
        let back = prior.from_unconstrained(&theta.view());
        assert_abs_diff_eq!(back.kernel().lengthscale(), &array![0.5, 2.], epsilon = 1e-12);
        assert_abs_diff_eq!(back.kernel().variance(), 1.5, epsilon = 1e-12);
        assert_eq!(back.mean().params(), array![-0.3]);
    }

    #[test]
    fn test_prior_sample_approx_moments() {
        // Monte carlo estimates of the prior moments from approximate sample paths
        let prior = Prior::new(Box::new(ZeroMean), Box::new(Rbf::new(5., 0.1)));
        let x = Array::linspace(-5., 5., 7).insert_axis(Axis(1));
        let sample = prior.sample_approx(1, 10_000, Key::new(42), 100).unwrap();
        let values = sample.evaluate(&x.view()).unwrap();
        assert_eq!(values.dim(), (7, 10_000));
        let mean = values.mean_axis(Axis(1)).unwrap();
        let var = values.var_axis(Axis(1), 0.);
        assert_abs_diff_eq!(mean, Array1::zeros(7), epsilon = 0.02);
        assert_abs_diff_eq!(var, Array1::from_elem(7, 0.1), epsilon = 0.05);
    }

    #[test]
    fn test_prior_sample_approx_invalid_counts() {
        let prior = Prior::default();
        assert!(prior.sample_approx(1, 0, Key::new(0), 10).is_err());
        assert!(prior.sample_approx(1, 10, Key::new(0), 0).is_err());
    }
}
