use crate::SamplingMethod;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::{rand::Rng, rand_distr::Uniform, RandomExt};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// The Halton design generates points of the low discrepancy Halton sequence.
///
/// The jth component of the ith point is the radical inverse of `i` in the base given
/// by the jth prime number. The sequence starts at index 1, hence the first point
/// of a one-dimensional design is `0.5`.
///
/// A scrambled Halton design applies a random shift modulo 1 to each component
/// (Cranley-Patterson rotation) which keeps the low discrepancy property while
/// allowing independent randomized replications of the design.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Halton<F: Float> {
    /// Sampling space definition as a (nx, 2) matrix
    /// The ith row is the [lower_bound, upper_bound] of xi, the ith component of x
    xlimits: Array2<F>,
    /// Number of leading sequence points to discard
    skip: usize,
    /// Per component shift in [0, 1) when scrambled
    shift: Option<Array1<F>>,
}

impl<F: Float> Halton<F> {
    /// Constructor given a design space given a (nx, 2) matrix \[\[lower bound, upper bound\], ...\]
    ///
    /// ```
    /// use gpbox_doe::{Halton, SamplingMethod};
    /// use ndarray::arr2;
    ///
    /// let doe = Halton::new(&arr2(&[[0.0, 1.0], [5.0, 10.0]]));
    /// let x = doe.sample(3);
    /// assert_eq!(x[[0, 0]], 0.5);
    /// ```
    ///
    /// **Panics** if xlimits number of columns is different from 2.
    pub fn new(xlimits: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        if xlimits.ncols() != 2 {
            panic!("xlimits must have 2 columns (lower, upper)");
        }
        Halton {
            xlimits: xlimits.to_owned(),
            skip: 0,
            shift: None,
        }
    }

    /// Discard the `skip` first points of the sequence
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Scramble the sequence with a random shift drawn from the given generator
    pub fn scrambled<R: Rng>(mut self, mut rng: R) -> Self {
        let nx = self.xlimits.nrows();
        let shift = Array1::random_using(nx, Uniform::new(0., 1.), &mut rng).mapv(|v| F::cast(v));
        self.shift = Some(shift);
        self
    }

    /// Whether a random shift is applied to the sequence
    pub fn is_scrambled(&self) -> bool {
        self.shift.is_some()
    }
}

impl<F: Float> SamplingMethod<F> for Halton<F> {
    fn sampling_space(&self) -> &Array2<F> {
        &self.xlimits
    }

    fn normalized_sample(&self, ns: usize) -> Array2<F> {
        let nx = self.xlimits.nrows();
        let bases = first_primes(nx);
        let mut doe = Array2::from_shape_fn((ns, nx), |(i, j)| {
            F::cast(radical_inverse(self.skip + i + 1, bases[j]))
        });
        if let Some(shift) = &self.shift {
            doe.outer_iter_mut().for_each(|mut row| {
                row.zip_mut_with(shift, |v, s| *v = (*v + *s).fract());
            });
        }
        doe
    }
}

/// Radical inverse of `index` in the given `base`, i.e. its digits mirrored about the decimal point
fn radical_inverse(mut index: usize, base: usize) -> f64 {
    let inv_base = 1. / base as f64;
    let mut factor = inv_base;
    let mut result = 0.;
    while index > 0 {
        result += (index % base) as f64 * factor;
        index /= base;
        factor *= inv_base;
    }
    result
}

fn first_primes(n: usize) -> Vec<usize> {
    let mut primes: Vec<usize> = Vec::with_capacity(n);
    let mut candidate = 2;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|p| *p * *p <= candidate)
            .all(|p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}
