use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::mean_functions::MeanFunction;
use crate::prior::Prior;
use crate::utils::scale_inputs;
use crate::Key;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;

/// Approximate GP sample paths as a value.
///
/// A path is `g(x) = m(x) + phi(x) w + K(x, X) v` where `phi` are `2L` random Fourier
/// features `sqrt(variance / L) [cos(x W^T), sin(x W^T)]` built from `L` frequencies `W`
/// drawn from the kernel spectral density, `w` are standard normal feature weights,
/// and the optional canonical term anchored at the training inputs `X` with
/// weights `v` turns prior paths into posterior paths (decoupled sampling).
///
/// Evaluation is a pure function of these fields: the same sample always gives
/// the same values, and its cost is linear in the number of query points.
#[derive(Clone, Debug)]
pub struct SampleFunction {
    mean: Box<dyn MeanFunction>,
    kernel: Box<dyn Kernel>,
    /// Frequencies divided by lengthscales (L, d)
    frequencies: Array2<f64>,
    /// Fourier feature weights (2L, S)
    feature_weights: Array2<f64>,
    /// Training inputs (n, d) and canonical basis weights (n, S)
    canonical: Option<(Array2<f64>, Array2<f64>)>,
}

pub(crate) fn check_sample_counts(num_samples: usize, num_features: usize) -> Result<()> {
    if num_samples == 0 {
        return Err(GpError::InvalidValueError(
            "number of samples should be a positive integer".to_string(),
        ));
    }
    if num_features == 0 {
        return Err(GpError::InvalidValueError(
            "number of features should be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Random Fourier features of the `x` points as a (n, 2L) matrix
pub(crate) fn fourier_features(
    x: &ArrayView2<f64>,
    frequencies: &Array2<f64>,
    variance: f64,
) -> Array2<f64> {
    let proj = x.dot(&frequencies.t());
    let scale = (variance / frequencies.nrows() as f64).sqrt();
    concatenate![Axis(1), proj.mapv(f64::cos), proj.mapv(f64::sin)] * scale
}

impl SampleFunction {
    /// Draw prior paths, frequencies and weights come from independent sub-keys of `key`
    pub(crate) fn from_prior(
        prior: &Prior,
        in_dim: usize,
        num_samples: usize,
        key: Key,
        num_features: usize,
    ) -> Result<SampleFunction> {
        check_sample_counts(num_samples, num_features)?;
        let kernel = prior.kernel();
        let keys = key.split_n(2);
        let omega = kernel.spectral_frequencies(num_features, in_dim, &mut keys[0].rng())?;
        let frequencies = scale_inputs(&omega.view(), kernel.lengthscale())?;
        let feature_weights = Array2::random_using(
            (2 * num_features, num_samples),
            StandardNormal,
            &mut keys[1].rng(),
        );
        Ok(SampleFunction {
            mean: prior.boxed_mean(),
            kernel: prior.boxed_kernel(),
            frequencies,
            feature_weights,
            canonical: None,
        })
    }

    /// Prior part of the paths evaluated at `x` without the mean function
    pub(crate) fn features_value(&self, x: &ArrayView2<f64>) -> Array2<f64> {
        fourier_features(x, &self.frequencies, self.kernel.variance()).dot(&self.feature_weights)
    }

    /// Add a canonical basis correction term anchored at training inputs
    pub(crate) fn with_canonical(mut self, x_train: Array2<f64>, weights: Array2<f64>) -> Self {
        self.canonical = Some((x_train, weights));
        self
    }

    /// Number of sample paths
    pub fn num_samples(&self) -> usize {
        self.feature_weights.ncols()
    }

    /// Number of random Fourier frequencies
    pub fn num_features(&self) -> usize {
        self.frequencies.nrows()
    }

    /// Input dimension
    pub fn in_dim(&self) -> usize {
        self.frequencies.ncols()
    }

    /// Whether the paths are conditioned on training data
    pub fn is_posterior(&self) -> bool {
        self.canonical.is_some()
    }

    /// Paths values at `x` (n, d) points as a (n, num_samples) matrix
    pub fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.in_dim() {
            return Err(GpError::DimensionMismatchError(format!(
                "sample paths defined on dimension {} evaluated on points of dimension {}",
                self.in_dim(),
                x.ncols()
            )));
        }
        let mut values = self.features_value(x);
        values += &self.mean.value(x).insert_axis(Axis(1));
        if let Some((x_train, weights)) = &self.canonical {
            values += &self
                .kernel
                .cross_covariance(x, &x_train.view())?
                .dot(weights);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Matern52;
    use crate::mean_functions::ConstantMean;
    use ndarray::array;

    #[test]
    fn test_prior_sample_is_reproducible() {
        let prior = Prior::new(Box::new(ConstantMean::new(1.)), Box::new(Matern52::new(0.5, 1.)));
        let x = array![[0.1, 0.2], [0.5, 0.5], [0.9, 0.1]];
        let s1 = prior.sample_approx(2, 3, Key::new(1), 50).unwrap();
        let s2 = prior.sample_approx(2, 3, Key::new(1), 50).unwrap();
        assert_eq!(s1.evaluate(&x.view()).unwrap(), s2.evaluate(&x.view()).unwrap());
        assert_eq!(s1.num_samples(), 3);
        assert_eq!(s1.num_features(), 50);
        assert!(!s1.is_posterior());

        let s3 = prior.sample_approx(2, 3, Key::new(2), 50).unwrap();
        assert_ne!(s1.evaluate(&x.view()).unwrap(), s3.evaluate(&x.view()).unwrap());
    }

    #[test]
    fn test_sample_dimension_mismatch() {
        let prior = Prior::default();
        let s = prior.sample_approx(2, 1, Key::new(1), 10).unwrap();
        assert!(matches!(
            s.evaluate(&array![[0.]].view()),
            Err(GpError::DimensionMismatchError(_))
        ));
    }
}
