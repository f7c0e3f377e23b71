//! Uniform random designs.
//!
//! Draws consume a generator stream: two successive calls to `sample` on the
//! same design return different points, and clones of a design share the stream.
use std::sync::{Arc, RwLock};

use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{rand::Rng, rand::SeedableRng, rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Generator stream shared between the clones of a design
pub(crate) type SharedRng<R> = Arc<RwLock<R>>;

/// Independent uniform draws over the box `xlimits`.
///
/// Unlike [`Halton`](crate::Halton) points, uniform points do not cover the space
/// evenly for small sample sizes, but they are unbiased which makes them the
/// reference design for random search baselines.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Random<F: Float, R: Rng> {
    /// (nx, 2) bounds, one `[lower, upper]` row per component
    xlimits: Array2<F>,
    stream: SharedRng<R>,
}

impl<F: Float> Random<F, Xoshiro256Plus> {
    /// Uniform design over `xlimits` seeded from system entropy
    ///
    /// ```
    /// use gpbox_doe::{Random, SamplingMethod};
    /// use ndarray::arr2;
    ///
    /// let x = Random::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]])).sample(4);
    /// assert_eq!(x.dim(), (4, 2));
    /// ```
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::from_entropy())
    }

    /// Uniform design over `xlimits` whose draws are fully determined by `seed`
    pub fn seeded(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, seed: u64) -> Self {
        Self::new_with_rng(xlimits, Xoshiro256Plus::seed_from_u64(seed))
    }
}

impl<F: Float, R: Rng> Random<F, R> {
    /// Uniform design over `xlimits` drawing from `rng`
    ///
    /// **Panics** if xlimits number of columns is different from 2.
    pub fn new_with_rng(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>, rng: R) -> Self {
        if xlimits.ncols() != 2 {
            panic!("xlimits must have 2 columns (lower, upper)");
        }
        Random {
            xlimits: xlimits.to_owned(),
            stream: Arc::new(RwLock::new(rng)),
        }
    }

    /// Same design drawing from a new generator stream
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Random<F, R2> {
        Random::new_with_rng(&self.xlimits, rng)
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Random<F, R> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        // a poisoned lock still holds a usable generator
        let mut rng = self.stream.write().unwrap_or_else(|e| e.into_inner());
        Array::random_using((ns, self.xlimits.nrows()), Uniform::new(0., 1.), &mut *rng)
            .mapv(|v| F::cast(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_random_within_bounds() {
        let xlimits = arr2(&[[5., 10.], [0., 1.], [-3., -2.]]);
        let actual = Random::seeded(&xlimits, 42).sample(50);
        assert_eq!(actual.dim(), (50, 3));
        for row in actual.rows() {
            for (j, v) in row.iter().enumerate() {
                assert!(xlimits[[j, 0]] <= *v && *v <= xlimits[[j, 1]]);
            }
        }
    }

    #[test]
    fn test_random_reproducible() {
        let xlimits = arr2(&[[5., 10.], [0., 1.]]);
        let a = Random::seeded(&xlimits, 42).sample(9);
        let b = Random::new(&xlimits)
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(9);
        let c = Random::seeded(&xlimits, 43).sample(9);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_shared_stream() {
        let xlimits = arr2(&[[0., 1.]]);
        let doe = Random::seeded(&xlimits, 0);
        let first = doe.sample(4);
        let second = doe.clone().sample(4);
        assert_ne!(first, second);

        // both draws are the first 8 values of the stream
        let all = Random::seeded(&xlimits, 0).sample(8);
        assert_eq!(all.slice(ndarray::s![..4, ..]), first);
        assert_eq!(all.slice(ndarray::s![4.., ..]), second);
    }
}
