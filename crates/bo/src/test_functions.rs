//! Analytic functions with known global minima used to validate decision making.
use crate::errors::{BoError, Result};
use crate::search_space::{ContinuousSearchSpace, SamplingStrategy};
use gpbox_gp::{Dataset, Key};
use ndarray::{array, Array1, Array2, ArrayView1, ArrayView2, Zip};

/// A black-box objective defined on a box domain with known global minimum
pub trait ContinuousTestFunction: Send + Sync {
    /// Name of the function
    fn name(&self) -> &'static str;

    /// Domain of the function
    fn search_space(&self) -> ContinuousSearchSpace;

    /// Global minimizers, one per row
    fn minimizer(&self) -> Array2<f64>;

    /// Global minimum value
    fn minimum(&self) -> f64;

    /// Value at a single point
    fn value(&self, x: &ArrayView1<f64>) -> f64;

    /// Values at the points of `x` (n, d) as a (n, 1) matrix
    fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        let dim = self.minimizer().ncols();
        if x.ncols() != dim {
            return Err(BoError::DimensionMismatchError(format!(
                "{} expects points of dimension {}, got {}",
                self.name(),
                dim,
                x.ncols()
            )));
        }
        let mut y = Array2::zeros((x.nrows(), 1));
        Zip::from(y.rows_mut())
            .and(x.rows())
            .par_for_each(|mut yi, xi| yi[0] = self.value(&xi));
        Ok(y)
    }

    /// `n` observations at points drawn from the domain with the given `strategy`
    fn generate_dataset(&self, n: usize, key: Key, strategy: SamplingStrategy) -> Result<Dataset> {
        let x = self.search_space().sample_with(n, key, strategy)?;
        let y = self.evaluate(&x.view())?;
        Ok(Dataset::new(&x, &y)?)
    }

    /// `n` uniformly drawn points of the domain
    fn generate_test_points(&self, n: usize, key: Key) -> Result<Array2<f64>> {
        self.search_space().sample_uniform(n, key)
    }
}

fn unit_interval(dim: usize) -> ContinuousSearchSpace {
    ContinuousSearchSpace::new_unchecked(Array1::zeros(dim), Array1::ones(dim))
}

/// Forrester function `(6x - 2)^2 sin(12x - 4)` on `[0, 1]`
#[derive(Clone, Copy, Debug, Default)]
pub struct Forrester;

impl ContinuousTestFunction for Forrester {
    fn name(&self) -> &'static str {
        "Forrester"
    }

    fn search_space(&self) -> ContinuousSearchSpace {
        unit_interval(1)
    }

    fn minimizer(&self) -> Array2<f64> {
        array![[0.757248757841856]]
    }

    fn minimum(&self) -> f64 {
        -6.020740055767083
    }

    fn value(&self, x: &ArrayView1<f64>) -> f64 {
        let v = x[0];
        (6. * v - 2.).powi(2) * (12. * v - 4.).sin()
    }
}

/// Six-hump camel function on `[-2, 2] x [-1, 1]`, two global minimizers
#[derive(Clone, Copy, Debug, Default)]
pub struct SixHumpCamel;

impl ContinuousTestFunction for SixHumpCamel {
    fn name(&self) -> &'static str {
        "SixHumpCamel"
    }

    fn search_space(&self) -> ContinuousSearchSpace {
        ContinuousSearchSpace::new_unchecked(array![-2., -1.], array![2., 1.])
    }

    fn minimizer(&self) -> Array2<f64> {
        array![
            [0.08984201368301331, -0.7126564032704135],
            [-0.08984201368301331, 0.7126564032704135]
        ]
    }

    fn minimum(&self) -> f64 {
        -1.031628453489877
    }

    fn value(&self, x: &ArrayView1<f64>) -> f64 {
        let (x1, x2) = (x[0], x[1]);
        let x1_sq = x1 * x1;
        let x2_sq = x2 * x2;
        (4. - 2.1 * x1_sq + x1_sq * x1_sq / 3.) * x1_sq + x1 * x2 + (-4. + 4. * x2_sq) * x2_sq
    }
}

fn goldstein_price(x1: f64, x2: f64) -> f64 {
    let a = 1.
        + (x1 + x2 + 1.).powi(2)
            * (19. - 14. * x1 + 3. * x1 * x1 - 14. * x2 + 6. * x1 * x2 + 3. * x2 * x2);
    let b = 30.
        + (2. * x1 - 3. * x2).powi(2)
            * (18. - 32. * x1 + 12. * x1 * x1 + 48. * x2 - 36. * x1 * x2 + 27. * x2 * x2);
    a * b
}

/// Goldstein-Price function on `[-2, 2]^2`
#[derive(Clone, Copy, Debug, Default)]
pub struct GoldsteinPrice;

impl ContinuousTestFunction for GoldsteinPrice {
    fn name(&self) -> &'static str {
        "GoldsteinPrice"
    }

    fn search_space(&self) -> ContinuousSearchSpace {
        ContinuousSearchSpace::new_unchecked(array![-2., -2.], array![2., 2.])
    }

    fn minimizer(&self) -> Array2<f64> {
        array![[0., -1.]]
    }

    fn minimum(&self) -> f64 {
        3.
    }

    fn value(&self, x: &ArrayView1<f64>) -> f64 {
        goldstein_price(x[0], x[1])
    }
}

const LOG_GOLDSTEIN_PRICE_MEAN: f64 = 8.693;
const LOG_GOLDSTEIN_PRICE_STD: f64 = 2.427;

/// Standardized logarithm of the Goldstein-Price function rescaled on `[0, 1]^2`
#[derive(Clone, Copy, Debug, Default)]
pub struct LogarithmicGoldsteinPrice;

impl ContinuousTestFunction for LogarithmicGoldsteinPrice {
    fn name(&self) -> &'static str {
        "LogarithmicGoldsteinPrice"
    }

    fn search_space(&self) -> ContinuousSearchSpace {
        unit_interval(2)
    }

    fn minimizer(&self) -> Array2<f64> {
        array![[0.5, 0.25]]
    }

    fn minimum(&self) -> f64 {
        (3f64.ln() - LOG_GOLDSTEIN_PRICE_MEAN) / LOG_GOLDSTEIN_PRICE_STD
    }

    fn value(&self, x: &ArrayView1<f64>) -> f64 {
        let gp = goldstein_price(4. * x[0] - 2., 4. * x[1] - 2.);
        (gp.ln() - LOG_GOLDSTEIN_PRICE_MEAN) / LOG_GOLDSTEIN_PRICE_STD
    }
}

/// Quadratic function `(x - 0.5)^2` on `[0, 1]`
#[derive(Clone, Copy, Debug, Default)]
pub struct Quadratic;

impl ContinuousTestFunction for Quadratic {
    fn name(&self) -> &'static str {
        "Quadratic"
    }

    fn search_space(&self) -> ContinuousSearchSpace {
        unit_interval(1)
    }

    fn minimizer(&self) -> Array2<f64> {
        array![[0.5]]
    }

    fn minimum(&self) -> f64 {
        0.
    }

    fn value(&self, x: &ArrayView1<f64>) -> f64 {
        x.mapv(|v| (v - 0.5).powi(2)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_space::SearchSpace;
    use approx::assert_abs_diff_eq;
    use paste::paste;

    macro_rules! test_minimum {
        ($fun:ident, $tol:expr) => {
            paste! {
                #[test]
                fn [<test_minimum_ $fun:snake>]() {
                    let f = $fun;
                    let minimizer = f.minimizer();
                    let values = f.evaluate(&minimizer.view()).unwrap();
                    for v in values.iter() {
                        assert_abs_diff_eq!(*v, f.minimum(), epsilon = $tol);
                    }
                    let space = f.search_space();
                    assert!(minimizer.rows().into_iter().all(|x| space.contains(&x)));

                    // no sampled point goes below the global minimum
                    let x = f.generate_test_points(500, Key::new(0)).unwrap();
                    let y = f.evaluate(&x.view()).unwrap();
                    assert!(y.iter().all(|v| *v >= f.minimum() - $tol));
                }
            }
        };
    }

    test_minimum!(Forrester, 1e-6);
    test_minimum!(SixHumpCamel, 1e-6);
    test_minimum!(GoldsteinPrice, 1e-9);
    test_minimum!(LogarithmicGoldsteinPrice, 1e-6);
    test_minimum!(Quadratic, 1e-12);

    #[test]
    fn test_against_reference_functions() {
        let x = GoldsteinPrice.generate_test_points(20, Key::new(1)).unwrap();
        let y = GoldsteinPrice.evaluate(&x.view()).unwrap();
        for (xi, yi) in x.rows().into_iter().zip(y.iter()) {
            let expected = argmin_testfunctions::goldsteinprice(&[xi[0], xi[1]]);
            assert_abs_diff_eq!(*yi, expected, epsilon = 1e-8 * expected.abs());
        }

        let x = Quadratic.generate_test_points(20, Key::new(2)).unwrap();
        let y = Quadratic.evaluate(&x.view()).unwrap();
        for (xi, yi) in x.rows().into_iter().zip(y.iter()) {
            let shifted: Vec<f64> = xi.iter().map(|v| v - 0.5).collect();
            assert_abs_diff_eq!(*yi, argmin_testfunctions::sphere(&shifted), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_generate_dataset() {
        let data = Forrester
            .generate_dataset(5, Key::new(42), SamplingStrategy::Halton)
            .unwrap();
        assert_eq!(data.n(), 5);
        assert_eq!(data.in_dim(), 1);
        assert_eq!(data.out_dim(), 1);
        let other = Forrester
            .generate_dataset(5, Key::new(42), SamplingStrategy::Halton)
            .unwrap();
        assert_eq!(data, other);
        // first Halton points in base 2
        let expected = array![0.5, 0.25, 0.75, 0.125, 0.625];
        assert_abs_diff_eq!(data.x().column(0), expected.view());
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = Array2::zeros((3, 2));
        assert!(matches!(
            Forrester.evaluate(&x.view()),
            Err(BoError::DimensionMismatchError(_))
        ));
    }
}
