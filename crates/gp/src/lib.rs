//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) models
//! used as probabilistic surrogates of black-box functions.
//!
//! A GP [`Prior`] is made of a [mean function](crate::mean_functions) and a stationary
//! [kernel](crate::kernels). Combined with a [`Likelihood`], it gives a [`Posterior`] with
//! [`construct_posterior`]: a gaussian likelihood yields a closed form [`ConjugatePosterior`],
//! other likelihoods (bernoulli) yield a [`NonConjugatePosterior`] over latent function values.
//!
//! Posteriors are fitted against a [`Dataset`] by maximizing the marginal likelihood
//! (resp. the posterior density of the latent values) with the Adam optimizer, see [`FitParams`].
//! All random operations take an explicit [`Key`] which makes results reproducible.
//!
//! Conjugate posteriors also provide approximate sample paths, as [`SampleFunction`] values,
//! computed with decoupled sampling: random Fourier features of the prior corrected by
//! canonical basis functions anchored at the training inputs.
//!
//! ```
//! use gpbox_gp::{construct_posterior, Dataset, FitParams, Key, Likelihood, Prior};
//! use gpbox_gp::{kernels::Matern52, mean_functions::ConstantMean};
//! use linfa::ParamGuard;
//! use ndarray::{array, Array, Axis};
//!
//! let x = array![[0.], [0.25], [0.5], [0.75], [1.]];
//! let data = Dataset::from_observations(&x.view(), |x| x.mapv(|v| (6. * v).sin())).unwrap();
//!
//! let prior = Prior::new(Box::new(ConstantMean::default()), Box::new(Matern52::default()));
//! let posterior = construct_posterior(prior, Likelihood::gaussian(1e-4))
//!     .fit(&data, &FitParams::new().n_iters(50).check().unwrap(), Key::new(0))
//!     .unwrap();
//!
//! let xtest = Array::linspace(0., 1., 11).insert_axis(Axis(1));
//! let (mean, variance) = posterior.predict_valvar(&xtest.view(), &data).unwrap();
//!
//! // 5 posterior sample paths evaluated on the test points
//! let paths = posterior.sample_approx(5, &data, Key::new(1), 100).unwrap();
//! let values = paths.evaluate(&xtest.view()).unwrap();
//! assert_eq!(values.dim(), (11, 5));
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod config;
mod dataset;
mod errors;
pub mod kernels;
mod key;
mod likelihoods;
pub mod mean_functions;
mod parameters;
mod posterior;
mod prior;
mod sample;
mod utils;

mod optimization;

pub use config::*;
pub use dataset::*;
pub use errors::*;
pub use kernels::Kernel;
pub use key::*;
pub use likelihoods::*;
pub use mean_functions::MeanFunction;
pub use parameters::*;
pub use posterior::*;
pub use prior::*;
pub use sample::SampleFunction;
pub use utils::{norm_cdf, norm_pdf};
