//! A module for stationary covariance kernels used as the prior covariance of GP models.
//!
//! Kernels are parameter containers: a lengthscale vector (one component for an isotropic
//! kernel, one per input dimension for automatic relevance determination) and a variance.
//! The covariance between `x` and `x'` is `variance * correlation(r)` where `r` is the
//! euclidean distance between the lengthscale-scaled points.
//!
//! The following kernels are implemented:
//! * radial basis function (squared exponential),
//! * matern 1/2 (absolute exponential),
//! * matern 3/2,
//! * matern 5/2.
//!
//! Each kernel also draws frequencies from its spectral density which are used by
//! random Fourier features to approximate GP sample paths.

use crate::errors::{GpError, Result};
use crate::utils::{cross_distances, scale_inputs};
use dyn_clonable::*;
use ndarray::{array, Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::{ChiSquared, StandardNormal};
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for stationary covariance kernels
#[clonable]
#[cfg_attr(feature = "serializable", typetag::serde(tag = "type"))]
pub trait Kernel: Clone + Send + Sync + fmt::Display {
    /// Kernel name
    fn name(&self) -> &'static str;

    /// Lengthscales, a single value for an isotropic kernel
    fn lengthscale(&self) -> &Array1<f64>;

    /// Variance (amplitude) of the kernel
    fn variance(&self) -> f64;

    /// Set lengthscales and variance
    fn set_hyperparameters(&mut self, lengthscale: Array1<f64>, variance: f64);

    /// Correlation value given the scaled distance `r` between two points
    fn correlation(&self, r: f64) -> f64;

    /// Draw `n` frequencies of dimension `d` from the normalized spectral density
    /// of the kernel (unit lengthscale) as a (n, d) matrix
    fn spectral_frequencies(
        &self,
        n: usize,
        d: usize,
        rng: &mut Xoshiro256Plus,
    ) -> Result<Array2<f64>>;

    /// Covariance matrix between the rows of `x` and the rows of `y`
    fn cross_covariance(&self, x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<Array2<f64>> {
        let xs = scale_inputs(x, self.lengthscale())?;
        let ys = scale_inputs(y, self.lengthscale())?;
        let r = cross_distances(&xs.view(), &ys.view())?;
        let variance = self.variance();
        Ok(r.mapv(|r| variance * self.correlation(r)))
    }

    /// Covariance matrix of the rows of `x`
    fn gram(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.cross_covariance(x, x)
    }
}

impl fmt::Debug for dyn Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Frequencies of a multivariate student-t law with `dof` degrees of freedom,
/// or of the standard normal law when `dof` is `None`
fn spectral_draws(
    n: usize,
    d: usize,
    dof: Option<f64>,
    rng: &mut Xoshiro256Plus,
) -> Result<Array2<f64>> {
    let z = Array2::<f64>::random_using((n, d), StandardNormal, rng);
    match dof {
        None => Ok(z),
        Some(dof) => {
            let chi2 =
                ChiSquared::new(dof).map_err(|e| GpError::InvalidValueError(e.to_string()))?;
            let scale = Array1::random_using(n, chi2, rng).mapv(|u| (dof / u).sqrt());
            Ok(z * scale.insert_axis(Axis(1)))
        }
    }
}

macro_rules! stationary_kernel {
    ($(#[$meta:meta])* $kernel:ident, $label:literal, $dof:expr, |$r:ident| $corr:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        #[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
        pub struct $kernel {
            lengthscale: Array1<f64>,
            variance: f64,
        }

        impl Default for $kernel {
            fn default() -> Self {
                $kernel {
                    lengthscale: array![1.],
                    variance: 1.,
                }
            }
        }

        impl $kernel {
            /// Isotropic kernel with given lengthscale and variance
            pub fn new(lengthscale: f64, variance: f64) -> Self {
                $kernel {
                    lengthscale: array![lengthscale],
                    variance,
                }
            }

            /// Kernel with one lengthscale per input dimension
            pub fn ard(lengthscale: Array1<f64>, variance: f64) -> Self {
                $kernel {
                    lengthscale,
                    variance,
                }
            }
        }

        impl fmt::Display for $kernel {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    f,
                    "{}(lengthscale={}, variance={})",
                    $label, self.lengthscale, self.variance
                )
            }
        }

        #[cfg_attr(feature = "serializable", typetag::serde)]
        impl Kernel for $kernel {
            fn name(&self) -> &'static str {
                $label
            }

            fn lengthscale(&self) -> &Array1<f64> {
                &self.lengthscale
            }

            fn variance(&self) -> f64 {
                self.variance
            }

            fn set_hyperparameters(&mut self, lengthscale: Array1<f64>, variance: f64) {
                self.lengthscale = lengthscale;
                self.variance = variance;
            }

            fn correlation(&self, $r: f64) -> f64 {
                $corr
            }

            fn spectral_frequencies(
                &self,
                n: usize,
                d: usize,
                rng: &mut Xoshiro256Plus,
            ) -> Result<Array2<f64>> {
                spectral_draws(n, d, $dof, rng)
            }
        }
    };
}

stationary_kernel!(
    /// Radial basis function (squared exponential) kernel
    ///
    /// corr(r) = exp(-r^2 / 2)
    Rbf,
    "Rbf",
    None,
    |r| (-0.5 * r * r).exp()
);

stationary_kernel!(
    /// Matern 1/2 (absolute exponential) kernel
    ///
    /// corr(r) = exp(-r)
    Matern12,
    "Matern12",
    Some(1.),
    |r| (-r).exp()
);

stationary_kernel!(
    /// Matern 3/2 kernel
    ///
    /// corr(r) = (1 + sqrt(3) r) exp(-sqrt(3) r)
    Matern32,
    "Matern32",
    Some(3.),
    |r| {
        let s = 3f64.sqrt() * r;
        (1. + s) * (-s).exp()
    }
);

stationary_kernel!(
    /// Matern 5/2 kernel
    ///
    /// corr(r) = (1 + sqrt(5) r + 5 r^2 / 3) exp(-sqrt(5) r)
    Matern52,
    "Matern52",
    Some(5.),
    |r| {
        let s = 5f64.sqrt() * r;
        (1. + s + s * s / 3.) * (-s).exp()
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Zip;
    use ndarray_rand::rand::SeedableRng;
    use paste::paste;

    #[test]
    fn test_rbf_values() {
        let k = Rbf::new(2., 0.5);
        let x = array![[0.], [2.]];
        let gram = k.gram(&x.view()).unwrap();
        let off = 0.5 * (-0.5f64).exp();
        assert_abs_diff_eq!(gram, array![[0.5, off], [off, 0.5]], epsilon = 1e-12);
    }

    #[test]
    fn test_ard_lengthscale() {
        let k = Matern52::ard(array![1., 10.], 1.);
        let x = array![[0., 0.]];
        let y = array![[1., 0.], [0., 10.]];
        let cov = k.cross_covariance(&x.view(), &y.view()).unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], cov[[0, 1]], epsilon = 1e-12);
        assert!(k.gram(&array![[0., 0., 0.]].view()).is_err());
    }

    #[test]
    fn test_boxed_kernel_clone() {
        let k: Box<dyn Kernel> = Box::new(Matern32::new(0.3, 2.));
        let mut k2 = k.clone();
        k2.set_hyperparameters(array![1.], 1.);
        assert_eq!(k.variance(), 2.);
        assert_eq!(k2.variance(), 1.);
        assert_eq!(format!("{:?}", k), "Matern32(lengthscale=[0.3], variance=2)");
    }

    macro_rules! test_spectral_density {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_spectral_density_ $kernel:lower>]() {
                    // E[cos(w.(x - y))] over spectral draws gives back the correlation
                    let kernel = $kernel::default();
                    let mut rng = Xoshiro256Plus::seed_from_u64(42);
                    let n = 200_000;
                    let w = kernel.spectral_frequencies(n, 2, &mut rng).unwrap();
                    for delta in [array![0.3, 0.], array![0.5, 0.5], array![1., -0.2]] {
                        let mut acc = 0.;
                        Zip::from(w.rows()).for_each(|row| acc += row.dot(&delta).cos());
                        let r = delta.dot(&delta).sqrt();
                        assert_abs_diff_eq!(acc / n as f64, kernel.correlation(r), epsilon = 1e-2);
                    }
                }
            }
        };
    }

    test_spectral_density!(Rbf);
    test_spectral_density!(Matern12);
    test_spectral_density!(Matern32);
    test_spectral_density!(Matern52);
}
