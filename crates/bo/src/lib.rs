//! This library implements Bayesian optimization decision making on top of the
//! [GP models](gpbox_gp) of `gpbox-gp`.
//!
//! A [`DecisionMaker`] minimizes black-box functions known only through their evaluations.
//! Starting from initial observations, it iterates
//! * ask: an [`AcquisitionFunctionBuilder`] turns the current posteriors into an
//!   [`AcquisitionFunction`] which an [`AcquisitionMaximizer`] maximizes over the
//!   [`ContinuousSearchSpace`] to get the next query points,
//! * evaluate: a [`FunctionEvaluator`] observes the tagged functions at the query points,
//! * tell: observations are appended to the datasets and a [`PosteriorHandler`] refits
//!   each posterior.
//!
//! Available acquisition functions are [`ThompsonSampling`] (minimum of an approximate
//! posterior sample path), [`ExpectedImprovement`] and [`ProbabilityOfImprovement`].
//!
//! The loop runs with the [argmin](https://www.argmin-rs.org) executor and is reproducible
//! given the initial [`Key`](gpbox_gp::Key). Analytic [test functions](crate::test_functions)
//! with known minima are provided to benchmark the decision making.
//!
//! # Example
//!
//! ```no_run
//! use gpbox_bo::{
//!     ContinuousAcquisitionMaximizer, ContinuousTestFunction, DecisionMaker, FunctionEvaluator,
//!     PosteriorHandler, SamplingStrategy, SixHumpCamel, ThompsonSampling, OBJECTIVE,
//! };
//! use gpbox_gp::{kernels::Matern52, mean_functions::ConstantMean};
//! use gpbox_gp::{FitParams, Key, Likelihood, Prior};
//! use std::collections::BTreeMap;
//!
//! let f = SixHumpCamel;
//! let data = f.generate_dataset(10, Key::new(0), SamplingStrategy::Halton).unwrap();
//!
//! let prior = Prior::new(Box::new(ConstantMean::default()), Box::new(Matern52::default()));
//! let handler = PosteriorHandler::new(prior, |_n| Likelihood::gaussian(1e-6), FitParams::new())
//!     .unwrap();
//!
//! let maker = DecisionMaker::new(
//!     f.search_space(),
//!     BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
//!     BTreeMap::from([(OBJECTIVE.to_string(), data)]),
//!     Box::new(ThompsonSampling::new(500).unwrap()),
//!     Box::new(ContinuousAcquisitionMaximizer::new(1000, 1).unwrap()),
//! )
//! .unwrap()
//! .key(Key::new(42));
//!
//! let evaluator = FunctionEvaluator::default()
//!     .with_function(OBJECTIVE, move |x| f.evaluate(x).unwrap());
//! let state = maker.run(evaluator, 20).expect("six hump camel minimized");
//! println!(
//!     "Best {:?} with log regret {}",
//!     state.best_observation(),
//!     state.log_regret(f.minimum())
//! );
//! ```
//!
//! # Logging
//!
//! Traces are emitted with the [log](https://docs.rs/log) facade and the decision maker
//! initializes [env_logger](https://docs.rs/env_logger) on stdout at `info` level.
//! The level is set with the `GPBOX_LOG` environment variable, ex `GPBOX_LOG=debug`.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod acquisition;
mod decision_maker;
mod errors;
mod evaluator;
mod maximizer;
mod posterior_handler;
mod search_space;
mod state;
pub mod test_functions;

pub use acquisition::{
    check_objective_present, AcquisitionFunction, AcquisitionFunctionBuilder,
    ExpectedImprovement, ProbabilityOfImprovement, ThompsonSampling,
};
pub use decision_maker::*;
pub use errors::*;
pub use evaluator::*;
pub use maximizer::*;
pub use posterior_handler::*;
pub use search_space::*;
pub use state::*;
pub use test_functions::{
    ContinuousTestFunction, Forrester, GoldsteinPrice, LogarithmicGoldsteinPrice, Quadratic,
    SixHumpCamel,
};

/// Env variable to set the logging level
pub const GPBOX_LOG: &str = "GPBOX_LOG";
