//! Fitting and refitting of surrogate models against growing datasets.
use crate::errors::{BoError, Result};
use gpbox_gp::{
    construct_posterior, Dataset, FitParams, FitValidParams, GpConfig, Key, Likelihood, Posterior,
    Prior,
};
use linfa::ParamGuard;
use log::{debug, warn};

/// Factor applied to the covariance jitter when a fit is retried
pub const JITTER_RETRY_FACTOR: f64 = 1e3;

/// Jitter of a retried fit, never below the default jitter
fn retry_jitter(jitter: f64) -> f64 {
    (jitter * JITTER_RETRY_FACTOR).max(GpConfig::default().jitter())
}

/// Builds the observation likelihood given the number of observations
pub type LikelihoodBuilder = Box<dyn Fn(usize) -> Likelihood + Send + Sync>;

/// Manages the posterior of one tagged function: a prior, a likelihood builder
/// and the fitting parameters.
///
/// The handler holds configuration only, posteriors are returned as new values.
pub struct PosteriorHandler {
    prior: Prior,
    likelihood_builder: LikelihoodBuilder,
    fit_params: FitValidParams,
}

impl PosteriorHandler {
    /// Handler of posteriors built from `prior` and the likelihood returned by
    /// `likelihood_builder` for the current number of observations.
    ///
    /// Fails with [`BoError::InvalidValueError`] when fitting parameters are invalid
    /// or when the number of fitting iterations is zero.
    pub fn new<L>(prior: Prior, likelihood_builder: L, fit_params: FitParams) -> Result<Self>
    where
        L: Fn(usize) -> Likelihood + Send + Sync + 'static,
    {
        let fit_params = fit_params
            .check()
            .map_err(|err| BoError::InvalidValueError(err.to_string()))?;
        if fit_params.n_iters() < 1 {
            return Err(BoError::InvalidValueError(
                "number of fitting iterations should be at least 1".to_string(),
            ));
        }
        Ok(PosteriorHandler {
            prior,
            likelihood_builder: Box::new(likelihood_builder),
            fit_params,
        })
    }

    /// Prior of the built posteriors
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    /// Fitting parameters
    pub fn fit_params(&self) -> &FitValidParams {
        &self.fit_params
    }

    /// Posterior conditioned on `dataset`, hyperparameters are fitted when `optimize` is true.
    pub fn get_posterior(&self, dataset: &Dataset, optimize: bool, key: Key) -> Result<Posterior> {
        let likelihood = (self.likelihood_builder)(dataset.n());
        let posterior = construct_posterior(self.prior.clone(), likelihood);
        if optimize {
            self.fit_with_retry(posterior, dataset, key, false)
        } else {
            Ok(posterior)
        }
    }

    /// Posterior conditioned on the grown `dataset` warm started from the
    /// hyperparameters of `previous`.
    ///
    /// The likelihood is rebuilt for the new number of observations.
    pub fn update_posterior(
        &self,
        dataset: &Dataset,
        previous: &Posterior,
        optimize: bool,
        key: Key,
    ) -> Result<Posterior> {
        let likelihood = (self.likelihood_builder)(dataset.n());
        let posterior = if likelihood == previous.likelihood() {
            previous.clone()
        } else {
            construct_posterior(previous.prior().clone(), likelihood)
        };
        if optimize {
            self.fit_with_retry(posterior, dataset, key, true)
        } else {
            Ok(posterior)
        }
    }

    /// Fit once, retry with an enlarged jitter on numerical instability.
    ///
    /// The retry always adds jitter, a zero configured jitter is raised to the default one.
    fn fit_with_retry(
        &self,
        posterior: Posterior,
        dataset: &Dataset,
        key: Key,
        warm_start: bool,
    ) -> Result<Posterior> {
        let fit = |posterior: Posterior| -> Result<Posterior> {
            let fitted = if warm_start {
                posterior.update(dataset, &self.fit_params, key)?
            } else {
                posterior.fit(dataset, &self.fit_params, key)?
            };
            Ok(fitted)
        };
        match fit(posterior.clone()) {
            Err(err) if err.is_numerical_instability() => {
                let jitter = retry_jitter(posterior.prior().config().jitter());
                warn!("Posterior fit failed ({err}), retry with jitter={jitter:e}");
                fit(posterior.with_jitter(jitter))
            }
            res => {
                if let Ok(fitted) = res.as_ref() {
                    debug!(
                        "Fitted {} on {} observations",
                        fitted.prior().kernel(),
                        dataset.n()
                    );
                }
                res
            }
        }
    }
}
