use crate::errors::{GpError, Result};
use ndarray::{Array1, Array2, ArrayView2, Zip};

const SQRT_2PI: f64 = 2.5066282746310007;

/// Cumulative distribution function of the standard normal law
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
}

/// Probability density function of the standard normal law
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Inputs divided component-wise by the lengthscales.
///
/// `lengthscale` has either one component (isotropic) or `x.ncols()` components (ARD).
pub(crate) fn scale_inputs(x: &ArrayView2<f64>, lengthscale: &Array1<f64>) -> Result<Array2<f64>> {
    if lengthscale.len() != 1 && lengthscale.len() != x.ncols() {
        return Err(GpError::DimensionMismatchError(format!(
            "{} lengthscales given for {}-dimensional inputs",
            lengthscale.len(),
            x.ncols()
        )));
    }
    Ok(x / lengthscale)
}

/// Euclidean distances between each row of x and each row of y as a (nrows(x), nrows(y)) matrix
pub(crate) fn cross_distances(x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<Array2<f64>> {
    if x.ncols() != y.ncols() {
        return Err(GpError::DimensionMismatchError(format!(
            "points of dimension {} compared with points of dimension {}",
            x.ncols(),
            y.ncols()
        )));
    }
    let mut dist = Array2::zeros((x.nrows(), y.nrows()));
    Zip::indexed(&mut dist).par_for_each(|(i, j), d| {
        *d = Zip::from(x.row(i))
            .and(y.row(j))
            .fold(0., |acc, a, b| acc + (a - b) * (a - b))
            .sqrt();
    });
    Ok(dist)
}
