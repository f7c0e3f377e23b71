//! `gpbox` is a toolbox for [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! surrogate modeling and Bayesian optimization decision making.
//!
//! It gathers the following crates:
//! * [`doe`]: design of experiments, random and Halton sampling,
//! * [`gp`]: GP priors, likelihoods and posteriors fitted against datasets, with
//!   approximate posterior sample paths,
//! * [`bo`]: the decision maker driving the ask / evaluate / tell loop with
//!   Thompson sampling, expected improvement or probability of improvement.
//!
//! ```no_run
//! use gpbox::bo::{
//!     ContinuousAcquisitionMaximizer, ContinuousTestFunction, DecisionMaker, Forrester,
//!     FunctionEvaluator, PosteriorHandler, SamplingStrategy, ThompsonSampling, OBJECTIVE,
//! };
//! use gpbox::gp::{FitParams, Key, Likelihood, Prior};
//! use std::collections::BTreeMap;
//!
//! let f = Forrester;
//! let data = f.generate_dataset(5, Key::new(0), SamplingStrategy::Halton).unwrap();
//! let handler = PosteriorHandler::new(Prior::default(), |_n| Likelihood::gaussian(1e-6), FitParams::new())
//!     .unwrap();
//! let maker = DecisionMaker::new(
//!     f.search_space(),
//!     BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
//!     BTreeMap::from([(OBJECTIVE.to_string(), data)]),
//!     Box::new(ThompsonSampling::new(500).unwrap()),
//!     Box::new(ContinuousAcquisitionMaximizer::new(1000, 1).unwrap()),
//! )
//! .unwrap();
//! let evaluator = FunctionEvaluator::default().with_function(OBJECTIVE, move |x| f.evaluate(x).unwrap());
//! let state = maker.run(evaluator, 10).unwrap();
//! println!("Best {:?}", state.best_observation());
//! ```
#![warn(missing_docs)]

pub use gpbox_bo as bo;
pub use gpbox_doe as doe;
pub use gpbox_gp as gp;
