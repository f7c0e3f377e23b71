//! Optimization domains.
use crate::errors::{BoError, Result};
use gpbox_doe::{Halton, Random, SamplingMethod};
use gpbox_gp::Key;
use ndarray::{stack, Array1, Array2, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2, Zip};
use serde::{Deserialize, Serialize};

/// Strategy used to draw points from a search space
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// Independent uniform draws
    #[default]
    Uniform,
    /// Deterministic Halton sequence, the key is not used
    Halton,
    /// Halton sequence randomly shifted modulo 1 using the key
    ScrambledHalton,
}

/// An optimization domain
pub trait SearchSpace {
    /// Number of components of a point
    fn dimensionality(&self) -> usize;

    /// Whether the point `x` belongs to the domain
    fn contains(&self, x: &ArrayView1<f64>) -> bool;

    /// `n` points of the domain as a (n, d) matrix, deterministic for a given `key`
    fn sample(&self, n: usize, key: Key) -> Result<Array2<f64>>;
}

/// A box-constrained continuous domain `[lower_i, upper_i]^d`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSearchSpace {
    lower_bounds: Array1<f64>,
    upper_bounds: Array1<f64>,
}

impl ContinuousSearchSpace {
    /// Domain with the given lower and upper bounds.
    ///
    /// Fails with [`BoError::InvalidDomainError`] when bounds are empty, of different
    /// lengths, not finite or when some lower bound is greater than its upper bound.
    pub fn new(
        lower_bounds: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        upper_bounds: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<Self> {
        if lower_bounds.is_empty() {
            return Err(BoError::InvalidDomainError(
                "bounds should have at least one component".to_string(),
            ));
        }
        if lower_bounds.len() != upper_bounds.len() {
            return Err(BoError::InvalidDomainError(format!(
                "lower bounds of length {} while upper bounds of length {}",
                lower_bounds.len(),
                upper_bounds.len()
            )));
        }
        if lower_bounds
            .iter()
            .chain(upper_bounds.iter())
            .any(|b| !b.is_finite())
        {
            return Err(BoError::InvalidDomainError(
                "bounds should be finite".to_string(),
            ));
        }
        if let Some(i) = lower_bounds
            .iter()
            .zip(upper_bounds.iter())
            .position(|(l, u)| l > u)
        {
            return Err(BoError::InvalidDomainError(format!(
                "lower bound {} greater than upper bound {} for component {}",
                lower_bounds[i], upper_bounds[i], i
            )));
        }
        Ok(ContinuousSearchSpace {
            lower_bounds: lower_bounds.to_owned(),
            upper_bounds: upper_bounds.to_owned(),
        })
    }

    /// Domain from bounds known to be valid
    pub(crate) fn new_unchecked(lower_bounds: Array1<f64>, upper_bounds: Array1<f64>) -> Self {
        ContinuousSearchSpace {
            lower_bounds,
            upper_bounds,
        }
    }

    /// Domain given as a (d, 2) matrix where the ith row holds `[lower_i, upper_i]`
    pub fn from_xlimits(xlimits: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Result<Self> {
        if xlimits.ncols() != 2 {
            return Err(BoError::InvalidDomainError(format!(
                "xlimits should have 2 columns, got {}",
                xlimits.ncols()
            )));
        }
        Self::new(&xlimits.column(0), &xlimits.column(1))
    }

    /// Lower bounds of the components
    pub fn lower_bounds(&self) -> &Array1<f64> {
        &self.lower_bounds
    }

    /// Upper bounds of the components
    pub fn upper_bounds(&self) -> &Array1<f64> {
        &self.upper_bounds
    }

    /// Bounds as a (d, 2) matrix, the sampling space of the DoE methods
    pub fn xlimits(&self) -> Array2<f64> {
        stack![Axis(1), self.lower_bounds, self.upper_bounds]
    }

    /// Bounds as `(lower, upper)` pairs
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.lower_bounds
            .iter()
            .zip(self.upper_bounds.iter())
            .map(|(&l, &u)| (l, u))
            .collect()
    }

    /// Projection of the points of `x` (n, d) onto the domain
    pub fn clip(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array2<f64> {
        let mut clipped = x.to_owned();
        Zip::from(clipped.rows_mut()).for_each(|mut row| {
            Zip::from(&mut row)
                .and(&self.lower_bounds)
                .and(&self.upper_bounds)
                .for_each(|v, &l, &u| *v = v.clamp(l, u));
        });
        clipped
    }

    /// Uniform samples
    pub fn sample_uniform(&self, n: usize, key: Key) -> Result<Array2<f64>> {
        self.sample_with(n, key, SamplingStrategy::Uniform)
    }

    /// Scrambled Halton samples
    pub fn sample_halton(&self, n: usize, key: Key) -> Result<Array2<f64>> {
        self.sample_with(n, key, SamplingStrategy::ScrambledHalton)
    }

    /// `n` points of the domain drawn with the given `strategy`.
    ///
    /// Fails with [`BoError::InvalidDomainError`] when `n` is zero.
    pub fn sample_with(
        &self,
        n: usize,
        key: Key,
        strategy: SamplingStrategy,
    ) -> Result<Array2<f64>> {
        if n == 0 {
            return Err(BoError::InvalidDomainError(
                "number of samples should be positive".to_string(),
            ));
        }
        let xlimits = self.xlimits();
        let samples = match strategy {
            SamplingStrategy::Uniform => Random::new_with_rng(&xlimits, key.rng()).sample(n),
            SamplingStrategy::Halton => Halton::new(&xlimits).sample(n),
            SamplingStrategy::ScrambledHalton => {
                Halton::new(&xlimits).scrambled(key.rng()).sample(n)
            }
        };
        // guard against rounding of lower + (upper - lower) * u
        Ok(self.clip(&samples))
    }
}

impl SearchSpace for ContinuousSearchSpace {
    fn dimensionality(&self) -> usize {
        self.lower_bounds.len()
    }

    fn contains(&self, x: &ArrayView1<f64>) -> bool {
        x.len() == self.dimensionality()
            && x
                .iter()
                .zip(self.lower_bounds.iter().zip(self.upper_bounds.iter()))
                .all(|(v, (l, u))| l <= v && v <= u)
    }

    fn sample(&self, n: usize, key: Key) -> Result<Array2<f64>> {
        self.sample_uniform(n, key)
    }
}
