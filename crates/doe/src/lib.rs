/*!
This library implements the Design of Experiments (DoE) methods used to seed
bayesian optimization loops and to generate candidate points for acquisition maximization.

A DoE method is a way to generate a set of points (i.e. a DoE) within a design (or sample) space `xlimits`.
The design space is defined as a 2D ndarray `(nx, 2)`, specifying lower bound and upper bound
of each `nx` components of the samples `x`.

Example:
```
use gpbox_doe::{Halton, Random, SamplingMethod};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

// Design space is defined as [5., 10.] x [0., 1.], samples are 2-dimensional.
let xlimits = arr2(&[[5., 10.], [0., 1.]]);
// We generate five samples using the Halton low discrepancy sequence.
let samples = Halton::new(&xlimits).sample(5);
// or else a randomly shifted Halton sequence
let samples = Halton::new(&xlimits)
    .scrambled(Xoshiro256Plus::seed_from_u64(42))
    .sample(5);
// or else uniformly at random, seeded for reproducibility
let samples = Random::seeded(&xlimits, 42).sample(5);
```

This library contains two kinds of sampling methods:
* [Halton Sequence](crate::Halton), optionally scrambled,
* [Random Sampling](crate::Random)

*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod halton;
mod random;
mod traits;

pub use halton::*;
pub use random::*;
pub use traits::*;
