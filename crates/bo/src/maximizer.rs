//! Continuous maximization of acquisition functions.
use crate::acquisition::{evaluate_at, first_argmax, AcquisitionFunction};
use crate::errors::{BoError, Result};
use crate::search_space::{ContinuousSearchSpace, SamplingStrategy};
use finitediff::FiniteDiff;
use gpbox_gp::Key;
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default max number of acquisition evaluations of one local optimization
pub const MAXIMIZER_MAX_EVAL_DEFAULT: usize = 200;

/// A strategy finding the point maximizing an acquisition function
pub trait AcquisitionMaximizer: Send + Sync {
    /// Maximizer of `acquisition` within `search_space` as a (1, d) matrix
    fn maximize(
        &self,
        acquisition: &dyn AcquisitionFunction,
        search_space: &ContinuousSearchSpace,
        key: Key,
    ) -> Result<Array2<f64>>;
}

/// Settings of the [`ContinuousAcquisitionMaximizer`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaximizerConfig {
    /// Number of candidates drawn to select the starting point of one local optimization
    pub(crate) num_initial_points: usize,
    /// Number of independent local optimizations
    pub(crate) num_restarts: usize,
    /// Strategy used to draw the candidates
    pub(crate) sampling_strategy: SamplingStrategy,
    /// Max number of acquisition evaluations of one local optimization
    pub(crate) max_eval: usize,
    /// Relative tolerance on the acquisition value to stop the local optimization
    pub(crate) ftol_rel: f64,
    /// Absolute tolerance on the acquisition value to stop the local optimization
    pub(crate) ftol_abs: f64,
}

impl Default for MaximizerConfig {
    fn default() -> Self {
        MaximizerConfig {
            num_initial_points: 100,
            num_restarts: 1,
            sampling_strategy: SamplingStrategy::Uniform,
            max_eval: MAXIMIZER_MAX_EVAL_DEFAULT,
            ftol_rel: 1e-6,
            ftol_abs: 1e-8,
        }
    }
}

impl MaximizerConfig {
    /// Sets the number of candidates drawn for each restart
    pub fn num_initial_points(mut self, num_initial_points: usize) -> Self {
        self.num_initial_points = num_initial_points;
        self
    }

    /// Sets the number of restarts
    pub fn num_restarts(mut self, num_restarts: usize) -> Self {
        self.num_restarts = num_restarts;
        self
    }

    /// Sets the candidate sampling strategy
    pub fn sampling_strategy(mut self, sampling_strategy: SamplingStrategy) -> Self {
        self.sampling_strategy = sampling_strategy;
        self
    }

    /// Sets the max number of evaluations of one local optimization
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    /// Sets the relative tolerance of the local optimization
    pub fn ftol_rel(mut self, ftol_rel: f64) -> Self {
        self.ftol_rel = ftol_rel;
        self
    }

    /// Sets the absolute tolerance of the local optimization
    pub fn ftol_abs(mut self, ftol_abs: f64) -> Self {
        self.ftol_abs = ftol_abs;
        self
    }

    /// Checks the settings
    pub fn check(self) -> Result<Self> {
        if self.num_initial_points < 1 {
            return Err(BoError::InvalidValueError(
                "number of initial points should be at least 1".to_string(),
            ));
        }
        if self.num_restarts < 1 {
            return Err(BoError::InvalidValueError(
                "number of restarts should be at least 1".to_string(),
            ));
        }
        if self.ftol_rel.is_nan() || self.ftol_rel < 0. || self.ftol_abs.is_nan() || self.ftol_abs < 0. {
            return Err(BoError::InvalidValueError(format!(
                "tolerances should be positive, got ftol_rel={} ftol_abs={}",
                self.ftol_rel, self.ftol_abs
            )));
        }
        Ok(self)
    }
}

/// Multistart local maximization over a box domain.
///
/// Each restart draws candidates from the search space, starts a bounded SLSQP
/// optimization from the best candidate (the first one in case of ties) and keeps the
/// optimized point when it strictly improves on that candidate. Restarts use independent keys,
/// run in parallel and are compared in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContinuousAcquisitionMaximizer {
    config: MaximizerConfig,
}

impl ContinuousAcquisitionMaximizer {
    /// Maximizer drawing `num_initial_points` candidates for each of the `num_restarts`
    /// local optimizations.
    ///
    /// Fails with [`BoError::InvalidValueError`] when one of the counts is zero.
    pub fn new(num_initial_points: usize, num_restarts: usize) -> Result<Self> {
        Self::from_config(
            MaximizerConfig::default()
                .num_initial_points(num_initial_points)
                .num_restarts(num_restarts),
        )
    }

    /// Maximizer with the given settings
    pub fn from_config(config: MaximizerConfig) -> Result<Self> {
        Ok(ContinuousAcquisitionMaximizer {
            config: config.check()?,
        })
    }

    /// Settings of the maximizer
    pub fn config(&self) -> &MaximizerConfig {
        &self.config
    }

    /// Best point and value of one restart
    fn maximize_once(
        &self,
        acquisition: &dyn AcquisitionFunction,
        search_space: &ContinuousSearchSpace,
        key: Key,
    ) -> Result<(Array1<f64>, f64)> {
        let candidates = search_space.sample_with(
            self.config.num_initial_points,
            key,
            self.config.sampling_strategy,
        )?;
        let values = acquisition.evaluate(&candidates.view())?;
        let best = first_argmax(&values).ok_or_else(|| {
            BoError::InvalidValueError("acquisition is NaN at every candidate".to_string())
        })?;
        let x_start = candidates.row(best).to_owned();
        let y_start = values[best];
        debug!("Start local optimization from x={x_start} (acquisition={y_start})");

        let obj = |x: &[f64], gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
            if x.iter().any(|v| v.is_nan()) {
                return f64::INFINITY;
            }
            let f = |x: &Vec<f64>| -> f64 { negated(acquisition, x) };
            if let Some(grad) = gradient {
                grad[..].copy_from_slice(&x.to_vec().central_diff(&f));
                if grad.iter().any(|g| !g.is_finite()) {
                    grad.iter_mut().for_each(|g| *g = 0.);
                }
            }
            negated(acquisition, x)
        };
        let cstrs: Vec<fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64> = vec![];
        let res = slsqp::minimize(
            obj,
            &x_start.to_vec(),
            &search_space.bounds(),
            &cstrs,
            (),
            self.config.max_eval,
            Some(slsqp::StopTols {
                ftol_rel: self.config.ftol_rel,
                ftol_abs: self.config.ftol_abs,
                ..slsqp::StopTols::default()
            }),
        );
        let (converged, x_opt) = match res {
            Ok((_, x_opt, _)) => (true, x_opt),
            Err((_, x_opt, _)) => (false, x_opt),
        };
        let x_opt = search_space
            .clip(&Array1::from(x_opt).insert_axis(Axis(0)))
            .row(0)
            .to_owned();
        let y_opt = evaluate_at(acquisition, &x_opt.to_vec())?;

        if y_opt.is_finite() && y_opt > y_start {
            Ok((x_opt, y_opt))
        } else {
            if converged {
                debug!("Optimized point not better than the best candidate, keep candidate");
            } else {
                let err = BoError::OptimisationFailedError(format!(
                    "no improvement over the best candidate x={x_start} (acquisition={y_start})"
                ));
                warn!("{err}, fall back to best candidate");
            }
            Ok((x_start, y_start))
        }
    }
}

/// Opposite of the acquisition value, infinite where it is not defined
fn negated(acquisition: &dyn AcquisitionFunction, x: &[f64]) -> f64 {
    match evaluate_at(acquisition, x) {
        Ok(v) if v.is_finite() => -v,
        _ => f64::INFINITY,
    }
}

impl AcquisitionMaximizer for ContinuousAcquisitionMaximizer {
    fn maximize(
        &self,
        acquisition: &dyn AcquisitionFunction,
        search_space: &ContinuousSearchSpace,
        key: Key,
    ) -> Result<Array2<f64>> {
        let keys = key.split_n(self.config.num_restarts);
        let results = keys
            .into_par_iter()
            .map(|key| self.maximize_once(acquisition, search_space, key))
            .collect::<Result<Vec<_>>>()?;
        let values = Array1::from_iter(results.iter().map(|(_, y)| *y));
        let best = first_argmax(&values).unwrap_or(0);
        let (x_best, y_best) = &results[best];
        debug!("Acquisition maximized at x={x_best} (acquisition={y_best})");
        Ok(x_best.to_owned().insert_axis(Axis(0)))
    }
}
