//! GP posteriors built from a [`Prior`] and a [`Likelihood`].
//!
//! A Gaussian likelihood gives a [`ConjugatePosterior`] whose predictive distribution is
//! available in closed form. Other likelihoods give a [`NonConjugatePosterior`] holding a
//! whitened latent function estimate `f = m(X) + L u` at the training inputs where `L` is
//! the Cholesky factor of the prior covariance.

use crate::errors::{GpError, Result};
use crate::likelihoods::Likelihood;
use crate::optimization::minimize;
use crate::parameters::FitValidParams;
use crate::prior::{Predictive, Prior};
use crate::sample::{check_sample_counts, SampleFunction};
use crate::{Dataset, Key};
use linfa_linalg::{cholesky::*, triangular::*};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

const LN_2PI: f64 = 1.8378770664093453;
/// Standard deviation of the random initialization of latent values
const LATENT_INIT_STD: f64 = 0.01;

fn check_training_data(data: &Dataset) -> Result<()> {
    if data.is_empty() {
        return Err(GpError::InvalidValueError(
            "training dataset should not be empty".to_string(),
        ));
    }
    if data.out_dim() != 1 {
        return Err(GpError::DimensionMismatchError(format!(
            "single output observations expected, got {} outputs",
            data.out_dim()
        )));
    }
    Ok(())
}

/// Lower Cholesky factor of `cov + diag I`
fn cholesky_with_diag(mut cov: Array2<f64>, diag: f64) -> Result<Array2<f64>> {
    cov.diag_mut().mapv_inplace(|v| v + diag);
    let chol = cov.cholesky().map_err(|e| {
        GpError::NumericalInstabilityError(format!("covariance factorization failed: {e}"))
    })?;
    if chol.iter().any(|v| !v.is_finite()) {
        return Err(GpError::NumericalInstabilityError(
            "non finite covariance factor".to_string(),
        ));
    }
    Ok(chol)
}

/// A posterior conditioned on its training data.
///
/// The training covariance is factorized once, each prediction then costs
/// `O(n^2)` per query point for `n` training points.
#[derive(Clone, Debug)]
pub struct Predictor {
    prior: Prior,
    x_train: Array2<f64>,
    /// Lower Cholesky factor of the training covariance
    chol: Array2<f64>,
    /// Whitened residuals `chol^-1 (f - m(X))`
    alpha: Array1<f64>,
}

impl Predictor {
    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    fn check_query(&self, x: &ArrayView2<f64>) -> Result<()> {
        if x.ncols() != self.x_train.ncols() {
            return Err(GpError::DimensionMismatchError(format!(
                "query points of dimension {} while training inputs have dimension {}",
                x.ncols(),
                self.x_train.ncols()
            )));
        }
        Ok(())
    }

    /// Distribution of the latent function values at `x`
    pub fn predict(&self, x: &ArrayView2<f64>) -> Result<Predictive> {
        self.check_query(x)?;
        let k_xt = self.prior.kernel().cross_covariance(&self.x_train.view(), x)?;
        let a = self.chol.solve_triangular(&k_xt, UPLO::Lower)?;
        let mean = self.prior.mean().value(x) + a.t().dot(&self.alpha);
        let covariance = self.prior.kernel().gram(x)? - a.t().dot(&a);
        Ok(Predictive { mean, covariance })
    }

    /// Marginal means and variances of the latent function at `x`
    pub fn predict_valvar(&self, x: &ArrayView2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        self.check_query(x)?;
        let kernel = self.prior.kernel();
        let k_xt = kernel.cross_covariance(&self.x_train.view(), x)?;
        let a = self.chol.solve_triangular(&k_xt, UPLO::Lower)?;
        let mean = self.prior.mean().value(x) + a.t().dot(&self.alpha);
        let prior_var = kernel.variance() * kernel.correlation(0.);
        let variance = a
            .mapv(|v| v * v)
            .sum_axis(Axis(0))
            .mapv(|s| (prior_var - s).max(0.));
        Ok((mean, variance))
    }
}

/// Posterior of a GP prior under a gaussian likelihood
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConjugatePosterior {
    prior: Prior,
    obs_noise: f64,
    trainable_noise: bool,
}

impl ConjugatePosterior {
    /// Prior of the posterior
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    /// Observation noise variance
    pub fn obs_noise(&self) -> f64 {
        self.obs_noise
    }

    /// Gaussian likelihood of the posterior
    pub fn likelihood(&self) -> Likelihood {
        Likelihood::Gaussian {
            obs_noise: self.obs_noise,
            trainable: self.trainable_noise,
        }
    }

    /// Lower Cholesky factor of `K(X, X) + (noise + jitter) I` and `chol^-1 (y - m(X))`
    fn factorize(&self, data: &Dataset) -> Result<(Array2<f64>, Array1<f64>)> {
        check_training_data(data)?;
        let x = data.x().view();
        let gram = self.prior.kernel().gram(&x)?;
        let chol = cholesky_with_diag(gram, self.obs_noise + self.prior.config().jitter())?;
        let residual = (&data.y().column(0) - &self.prior.mean().value(&x)).insert_axis(Axis(1));
        let alpha = chol.solve_triangular(&residual, UPLO::Lower)?;
        Ok((chol, alpha.column(0).to_owned()))
    }

    /// Log marginal likelihood (log evidence) of the observations
    pub fn marginal_log_likelihood(&self, data: &Dataset) -> Result<f64> {
        let (chol, alpha) = self.factorize(data)?;
        let n = data.n() as f64;
        let log_det = chol.diag().mapv(f64::ln).sum();
        let mll = -0.5 * alpha.dot(&alpha) - log_det - 0.5 * n * LN_2PI;
        if mll.is_finite() {
            Ok(mll)
        } else {
            Err(GpError::NumericalInstabilityError(format!(
                "marginal log likelihood value {mll}"
            )))
        }
    }

    /// Posterior conditioned on the observations, ready for repeated predictions
    pub fn predictor(&self, data: &Dataset) -> Result<Predictor> {
        let (chol, alpha) = self.factorize(data)?;
        Ok(Predictor {
            prior: self.prior.clone(),
            x_train: data.x().to_owned(),
            chol,
            alpha,
        })
    }

    /// Distribution of the latent function values at `x` given the observations
    pub fn predict(&self, x: &ArrayView2<f64>, data: &Dataset) -> Result<Predictive> {
        self.predictor(data)?.predict(x)
    }

    /// Marginal means and variances of the latent function at `x` given the observations
    pub fn predict_valvar(
        &self,
        x: &ArrayView2<f64>,
        data: &Dataset,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        self.predictor(data)?.predict_valvar(x)
    }

    /// Approximate posterior sample paths using decoupled sampling.
    ///
    /// A prior path `f` is drawn with `num_features` random Fourier features then
    /// corrected with canonical basis functions `K(., X) v` where
    /// `v = (K(X, X) + noise I)^-1 (y - m(X) - f(X) - e)` and `e ~ N(0, noise I)`.
    pub fn sample_approx(
        &self,
        num_samples: usize,
        data: &Dataset,
        key: Key,
        num_features: usize,
    ) -> Result<SampleFunction> {
        check_sample_counts(num_samples, num_features)?;
        check_training_data(data)?;
        let (prior_key, noise_key) = key.split();
        let sample = SampleFunction::from_prior(
            &self.prior,
            data.in_dim(),
            num_samples,
            prior_key,
            num_features,
        )?;

        let x = data.x().view();
        let noise = Normal::new(0., self.obs_noise.sqrt())
            .map_err(|e| GpError::InvalidValueError(e.to_string()))?;
        let eps = Array2::random_using((data.n(), num_samples), noise, &mut noise_key.rng());
        let mut residuals = -(sample.features_value(&x) + eps);
        residuals += &(&data.y().column(0) - &self.prior.mean().value(&x)).insert_axis(Axis(1));

        let gram = self.prior.kernel().gram(&x)?;
        let chol = cholesky_with_diag(gram, self.obs_noise + self.prior.config().jitter())?;
        let half = chol.solve_triangular(&residuals, UPLO::Lower)?;
        let weights = chol.t().solve_triangular(&half, UPLO::Upper)?;
        Ok(sample.with_canonical(data.x().to_owned(), weights))
    }

    fn n_params(&self) -> usize {
        self.prior.n_params() + usize::from(self.trainable_noise)
    }

    fn unconstrained_params(&self) -> Array1<f64> {
        let mut theta = self.prior.unconstrained_params();
        if self.trainable_noise {
            theta.push(self.prior.config().positive_transform().inverse(self.obs_noise));
        }
        Array1::from(theta)
    }

    fn from_unconstrained(&self, theta: &ArrayView1<f64>) -> Self {
        let mut post = self.clone();
        post.prior = self.prior.from_unconstrained(theta);
        if self.trainable_noise {
            post.obs_noise = self
                .prior
                .config()
                .positive_transform()
                .forward(theta[self.n_params() - 1]);
        }
        post
    }

    fn fit(&self, data: &Dataset, params: &FitValidParams) -> Result<Self> {
        check_training_data(data)?;
        let objective = |theta: &Array1<f64>| -> f64 {
            self.from_unconstrained(&theta.view())
                .marginal_log_likelihood(data)
                .map(|mll| -mll)
                .unwrap_or(f64::NAN)
        };
        let (theta, nlml) = minimize(objective, self.unconstrained_params(), params)?;
        let fitted = self.from_unconstrained(&theta.view());
        debug!(
            "Conjugate GP fitted: kernel={}, mean={}, noise={}, nlml={}",
            fitted.prior.kernel(),
            fitted.prior.mean(),
            fitted.obs_noise,
            nlml
        );
        Ok(fitted)
    }
}

/// Posterior of a GP prior under a non gaussian likelihood
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct NonConjugatePosterior {
    prior: Prior,
    likelihood: Likelihood,
    /// Whitened latent values at the training inputs
    latent: Array1<f64>,
}

impl NonConjugatePosterior {
    /// Prior of the posterior
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    /// Likelihood of the posterior
    pub fn likelihood(&self) -> Likelihood {
        self.likelihood
    }

    /// Whitened latent values `u` at the training inputs
    pub fn latent(&self) -> &Array1<f64> {
        &self.latent
    }

    /// Whitened latent values for `n` training points, the current values are kept
    /// and missing ones are drawn from `N(0, LATENT_INIT_STD^2)`
    fn latent_for(&self, n: usize, key: Key) -> Result<Array1<f64>> {
        let kept = self.latent.len().min(n);
        let init = Normal::new(0., LATENT_INIT_STD)
            .map_err(|e| GpError::InvalidValueError(e.to_string()))?;
        let mut latent = Array1::random_using(n, init, &mut key.rng());
        latent
            .slice_mut(s![..kept])
            .assign(&self.latent.slice(s![..kept]));
        Ok(latent)
    }

    fn checked_latent(&self, data: &Dataset) -> Result<&Array1<f64>> {
        check_training_data(data)?;
        if self.latent.len() != data.n() {
            return Err(GpError::DimensionMismatchError(format!(
                "latent function fitted on {} points used with {} training points",
                self.latent.len(),
                data.n()
            )));
        }
        Ok(&self.latent)
    }

    fn prior_cholesky(&self, data: &Dataset) -> Result<Array2<f64>> {
        let gram = self.prior.kernel().gram(&data.x().view())?;
        cholesky_with_diag(gram, self.prior.config().jitter())
    }

    /// Log joint density of the observations and of the whitened latent values
    pub fn log_posterior_density(&self, data: &Dataset) -> Result<f64> {
        let latent = self.checked_latent(data)?;
        let chol = self.prior_cholesky(data)?;
        let f = self.prior.mean().value(&data.x().view()) + chol.dot(latent);
        let log_lik = self.likelihood.log_prob(&data.y().column(0), &f.view());
        let log_prior = -0.5 * latent.dot(latent) - 0.5 * latent.len() as f64 * LN_2PI;
        let lpd = log_lik + log_prior;
        if lpd.is_finite() {
            Ok(lpd)
        } else {
            Err(GpError::NumericalInstabilityError(format!(
                "log posterior density value {lpd}"
            )))
        }
    }

    /// Posterior conditioned on the fitted latent values, ready for repeated predictions
    pub fn predictor(&self, data: &Dataset) -> Result<Predictor> {
        let latent = self.checked_latent(data)?;
        let chol = self.prior_cholesky(data)?;
        Ok(Predictor {
            prior: self.prior.clone(),
            x_train: data.x().to_owned(),
            chol,
            alpha: latent.clone(),
        })
    }

    /// Distribution of the latent function values at `x` given the fitted latent values
    pub fn predict(&self, x: &ArrayView2<f64>, data: &Dataset) -> Result<Predictive> {
        self.predictor(data)?.predict(x)
    }

    /// Marginal means and variances of the latent function at `x`
    pub fn predict_valvar(
        &self,
        x: &ArrayView2<f64>,
        data: &Dataset,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        self.predictor(data)?.predict_valvar(x)
    }

    fn unconstrained_params(&self) -> Array1<f64> {
        let mut theta = self.prior.unconstrained_params();
        theta.extend(self.latent.iter());
        Array1::from(theta)
    }

    fn from_unconstrained(&self, theta: &ArrayView1<f64>) -> Self {
        let n_prior = self.prior.n_params();
        NonConjugatePosterior {
            prior: self.prior.from_unconstrained(theta),
            likelihood: self.likelihood,
            latent: theta.slice(s![n_prior..]).to_owned(),
        }
    }

    fn fit(&self, data: &Dataset, params: &FitValidParams) -> Result<Self> {
        self.checked_latent(data)?;
        let objective = |theta: &Array1<f64>| -> f64 {
            self.from_unconstrained(&theta.view())
                .log_posterior_density(data)
                .map(|lpd| -lpd)
                .unwrap_or(f64::NAN)
        };
        let (theta, nlpd) = minimize(objective, self.unconstrained_params(), params)?;
        let fitted = self.from_unconstrained(&theta.view());
        debug!(
            "Non conjugate GP fitted: kernel={}, mean={}, nlpd={}",
            fitted.prior.kernel(),
            fitted.prior.mean(),
            nlpd
        );
        Ok(fitted)
    }
}

/// A GP posterior, selected by the conjugacy of the likelihood
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Posterior {
    /// Closed form posterior (gaussian likelihood)
    Conjugate(ConjugatePosterior),
    /// Latent function posterior (other likelihoods)
    NonConjugate(NonConjugatePosterior),
}

/// Posterior of the `prior` GP under the `likelihood` observation model
///
/// ```
/// use gpbox_gp::{construct_posterior, Likelihood, Prior};
///
/// let posterior = construct_posterior(Prior::default(), Likelihood::gaussian(1e-2));
/// assert!(posterior.is_conjugate());
/// let posterior = construct_posterior(Prior::default(), Likelihood::Bernoulli);
/// assert!(!posterior.is_conjugate());
/// ```
pub fn construct_posterior(prior: Prior, likelihood: Likelihood) -> Posterior {
    match likelihood {
        Likelihood::Gaussian {
            obs_noise,
            trainable,
        } => Posterior::Conjugate(ConjugatePosterior {
            prior,
            obs_noise,
            trainable_noise: trainable,
        }),
        _ => Posterior::NonConjugate(NonConjugatePosterior {
            prior,
            likelihood,
            latent: Array1::zeros(0),
        }),
    }
}

impl Posterior {
    /// Prior of the posterior
    pub fn prior(&self) -> &Prior {
        match self {
            Posterior::Conjugate(post) => post.prior(),
            Posterior::NonConjugate(post) => post.prior(),
        }
    }

    /// Likelihood of the posterior
    pub fn likelihood(&self) -> Likelihood {
        match self {
            Posterior::Conjugate(post) => post.likelihood(),
            Posterior::NonConjugate(post) => post.likelihood(),
        }
    }

    /// Whether the posterior is available in closed form
    pub fn is_conjugate(&self) -> bool {
        matches!(self, Posterior::Conjugate(_))
    }

    /// Objective minimized by [`Posterior::fit`]: negative log marginal likelihood for
    /// a conjugate posterior, negative log posterior density otherwise
    pub fn objective(&self, data: &Dataset) -> Result<f64> {
        match self {
            Posterior::Conjugate(post) => post.marginal_log_likelihood(data).map(|v| -v),
            Posterior::NonConjugate(post) => post.log_posterior_density(data).map(|v| -v),
        }
    }

    /// Distribution of the latent function values at `x` given the training `data`
    pub fn predict(&self, x: &ArrayView2<f64>, data: &Dataset) -> Result<Predictive> {
        match self {
            Posterior::Conjugate(post) => post.predict(x, data),
            Posterior::NonConjugate(post) => post.predict(x, data),
        }
    }

    /// Marginal means and variances of the latent function at `x` given the training `data`
    pub fn predict_valvar(
        &self,
        x: &ArrayView2<f64>,
        data: &Dataset,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        match self {
            Posterior::Conjugate(post) => post.predict_valvar(x, data),
            Posterior::NonConjugate(post) => post.predict_valvar(x, data),
        }
    }

    /// Posterior conditioned on the training `data`, to be used for repeated predictions
    /// against the same observations
    pub fn predictor(&self, data: &Dataset) -> Result<Predictor> {
        match self {
            Posterior::Conjugate(post) => post.predictor(data),
            Posterior::NonConjugate(post) => post.predictor(data),
        }
    }

    /// Approximate posterior sample paths, see [`ConjugatePosterior::sample_approx`].
    ///
    /// Only available for conjugate posteriors.
    pub fn sample_approx(
        &self,
        num_samples: usize,
        data: &Dataset,
        key: Key,
        num_features: usize,
    ) -> Result<SampleFunction> {
        match self {
            Posterior::Conjugate(post) => post.sample_approx(num_samples, data, key, num_features),
            Posterior::NonConjugate(_) => Err(GpError::NotSupportedError(
                "approximate sampling requires a conjugate posterior".to_string(),
            )),
        }
    }

    /// Fit hyperparameters (and latent values) against `data` starting from the
    /// current hyperparameters. The `key` initializes the latent values of a
    /// non conjugate posterior.
    ///
    /// Fails with [`GpError::NumericalInstabilityError`] when the objective
    /// or its gradient is not finite during the optimization.
    pub fn fit(self, data: &Dataset, params: &FitValidParams, key: Key) -> Result<Posterior> {
        match self {
            Posterior::Conjugate(post) => post.fit(data, params).map(Posterior::Conjugate),
            Posterior::NonConjugate(post) => {
                let fresh = NonConjugatePosterior {
                    latent: Array1::zeros(0),
                    ..post
                };
                let latent = fresh.latent_for(data.n(), key)?;
                NonConjugatePosterior { latent, ..fresh }
                    .fit(data, params)
                    .map(Posterior::NonConjugate)
            }
        }
    }

    /// Refit against a grown `data` warm starting from the current hyperparameters
    /// and latent values
    pub fn update(self, data: &Dataset, params: &FitValidParams, key: Key) -> Result<Posterior> {
        match self {
            Posterior::Conjugate(post) => post.fit(data, params).map(Posterior::Conjugate),
            Posterior::NonConjugate(post) => {
                let latent = post.latent_for(data.n(), key)?;
                NonConjugatePosterior { latent, ..post }
                    .fit(data, params)
                    .map(Posterior::NonConjugate)
            }
        }
    }

    /// Same posterior with the given covariance jitter
    pub fn with_jitter(self, jitter: f64) -> Posterior {
        match self {
            Posterior::Conjugate(post) => Posterior::Conjugate(ConjugatePosterior {
                prior: post.prior.with_jitter(jitter),
                ..post
            }),
            Posterior::NonConjugate(post) => Posterior::NonConjugate(NonConjugatePosterior {
                prior: post.prior.with_jitter(jitter),
                ..post
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{Matern32, Matern52, Rbf};
    use crate::mean_functions::{ConstantMean, ZeroMean};
    use crate::parameters::FitParams;
    use approx::{assert_abs_diff_eq, assert_abs_diff_ne};
    use linfa::ParamGuard;
    use ndarray::{array, Array, Zip};
    use paste::paste;

    fn training_data() -> Dataset {
        let x = array![[0.], [0.25], [0.5], [0.75], [1.]];
        Dataset::from_observations(&x.view(), |x| x.mapv(|v| (6. * v).sin())).unwrap()
    }

    fn conjugate(kernel: Box<dyn crate::Kernel>, noise: f64) -> Posterior {
        construct_posterior(
            Prior::new(Box::new(ZeroMean), kernel),
            Likelihood::gaussian(noise),
        )
    }

    #[test]
    fn test_single_point_posterior() {
        let data = Dataset::new(&array![[0.]], &array![[1.]]).unwrap();
        let post = conjugate(Box::new(Rbf::new(1., 1.)), 0.01);
        let s = 1.01 + 1e-6;

        let pred = post.predict(&array![[0.]].view(), &data).unwrap();
        assert_abs_diff_eq!(pred.mean[0], 1. / s, epsilon = 1e-12);
        assert_abs_diff_eq!(pred.variance()[0], 1. - 1. / s, epsilon = 1e-12);

        let expected = -0.5 / s - 0.5 * s.ln() - 0.5 * LN_2PI;
        assert_abs_diff_eq!(post.objective(&data).unwrap(), -expected, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_valvar_matches_predict() {
        let data = training_data();
        let post = conjugate(Box::new(Matern52::new(0.3, 1.)), 1e-4);
        let x = Array::linspace(-0.2, 1.2, 9).insert_axis(Axis(1));
        let pred = post.predict(&x.view(), &data).unwrap();
        let (mean, var) = post.predict_valvar(&x.view(), &data).unwrap();
        assert_abs_diff_eq!(pred.mean, mean, epsilon = 1e-10);
        assert_abs_diff_eq!(pred.variance(), var, epsilon = 1e-10);
        // interpolation at training points with small noise
        let (mean, var) = post.predict_valvar(&data.x().view(), &data).unwrap();
        assert_abs_diff_eq!(mean, data.y().column(0), epsilon = 1e-2);
        assert!(var.iter().all(|v| *v < 1e-3));
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let data = training_data();
        let post = conjugate(Box::new(Rbf::default()), 1e-2);
        let res = post.predict(&array![[0., 1.]].view(), &data);
        assert!(matches!(res, Err(GpError::DimensionMismatchError(_))));

        let multi = Dataset::new(&array![[0.]], &array![[1., 2.]]).unwrap();
        let res = post.predict(&array![[0.]].view(), &multi);
        assert!(matches!(res, Err(GpError::DimensionMismatchError(_))));
    }

    #[test]
    fn test_predictor_reuses_factorization() {
        let data = training_data();
        let x = Array::linspace(-0.2, 1.2, 7).insert_axis(Axis(1));
        let post = conjugate(Box::new(Matern32::new(0.4, 2.)), 1e-3);
        let predictor = post.predictor(&data).unwrap();
        assert_eq!(predictor.n_train(), data.n());
        let (mean, var) = post.predict_valvar(&x.view(), &data).unwrap();
        let (p_mean, p_var) = predictor.predict_valvar(&x.view()).unwrap();
        assert_eq!(mean, p_mean);
        assert_eq!(var, p_var);
        assert_eq!(
            post.predict(&x.view(), &data).unwrap(),
            predictor.predict(&x.view()).unwrap()
        );
        assert!(matches!(
            predictor.predict_valvar(&Array2::<f64>::zeros((2, 3)).view()),
            Err(GpError::DimensionMismatchError(_))
        ));

        let classes = classification_data();
        let params = FitParams::new().n_iters(5).check().unwrap();
        let fitted = construct_posterior(Prior::default(), Likelihood::Bernoulli)
            .fit(&classes, &params, Key::new(0))
            .unwrap();
        let (mean, var) = fitted.predict_valvar(&x.view(), &classes).unwrap();
        let (p_mean, p_var) = fitted
            .predictor(&classes)
            .unwrap()
            .predict_valvar(&x.view())
            .unwrap();
        assert_eq!(mean, p_mean);
        assert_eq!(var, p_var);
    }

    #[test]
    fn test_sample_approx_reproducible() {
        let data = training_data();
        let post = conjugate(Box::new(Rbf::new(0.2, 1.)), 1e-3);
        let grid = Array::linspace(-1., 2., 50).insert_axis(Axis(1));

        let s1 = post.sample_approx(3, &data, Key::new(0), 100).unwrap();
        let s2 = post.sample_approx(3, &data, Key::new(0), 100).unwrap();
        let v1 = s1.evaluate(&grid.view()).unwrap();
        assert_eq!(v1, s2.evaluate(&grid.view()).unwrap());
        assert!(s1.is_posterior());

        let s3 = post.sample_approx(3, &data, Key::new(1), 100).unwrap();
        let v3 = s3.evaluate(&grid.view()).unwrap();
        let max_diff = Zip::from(&v1)
            .and(&v3)
            .fold(0f64, |acc, a, b| acc.max((a - b).abs()));
        assert!(max_diff > 0.1);
    }

    #[test]
    fn test_sample_approx_invalid_counts() {
        let data = training_data();
        let post = conjugate(Box::new(Rbf::default()), 1e-2);
        assert!(matches!(
            post.sample_approx(0, &data, Key::new(0), 10),
            Err(GpError::InvalidValueError(_))
        ));
        assert!(matches!(
            post.sample_approx(1, &data, Key::new(0), 0),
            Err(GpError::InvalidValueError(_))
        ));
    }

    macro_rules! test_sample_approx_moments {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_sample_approx_moments_ $kernel:lower>]() {
                    // unit prior variance, the tolerances are relative errors
                    let data = training_data();
                    let post = conjugate(Box::new($kernel::new(0.3, 1.)), 0.1);
                    let x = Array::linspace(-0.5, 1.5, 6).insert_axis(Axis(1));
                    let (mean, var) = post.predict_valvar(&x.view(), &data).unwrap();
                    assert!(var.iter().any(|v| *v > 0.9));

                    // batches draw their own frequencies, which averages the
                    // random features error out
                    let (n_batches, batch_size) = (10, 4_000);
                    let mut sum = Array1::<f64>::zeros(x.nrows());
                    let mut sum_sq = Array1::<f64>::zeros(x.nrows());
                    for key in Key::new(42).split_n(n_batches) {
                        let sample = post.sample_approx(batch_size, &data, key, 500).unwrap();
                        let values = sample.evaluate(&x.view()).unwrap();
                        sum += &values.sum_axis(Axis(1));
                        sum_sq += &values.mapv(|v| v * v).sum_axis(Axis(1));
                    }
                    let n = (n_batches * batch_size) as f64;
                    let mc_mean = sum / n;
                    let mc_var = sum_sq / n - mc_mean.mapv(|m| m * m);
                    assert_abs_diff_eq!(mc_mean, mean, epsilon = 0.02);
                    assert_abs_diff_eq!(mc_var, var, epsilon = 0.05);
                }
            }
        };
    }

    test_sample_approx_moments!(Rbf);
    test_sample_approx_moments!(Matern32);
    test_sample_approx_moments!(Matern52);

    #[test]
    fn test_fit_improves_objective_and_is_deterministic() {
        let data = training_data();
        let post = construct_posterior(
            Prior::new(Box::new(ConstantMean::default()), Box::new(Rbf::new(1., 1.))),
            Likelihood::gaussian(0.1),
        );
        let params = FitParams::new().n_iters(50).check().unwrap();
        let before = post.objective(&data).unwrap();
        let fitted = post.clone().fit(&data, &params, Key::new(0)).unwrap();
        let after = fitted.objective(&data).unwrap();
        assert!(after < before);

        let again = post.fit(&data, &params, Key::new(1)).unwrap();
        assert_eq!(again.objective(&data).unwrap(), after);
        assert_abs_diff_ne!(fitted.prior().kernel().lengthscale()[0], 1., epsilon = 1e-6);
    }

    #[test]
    fn test_fit_non_finite_data() {
        let data = Dataset::new(&array![[0.], [1.]], &array![[f64::NAN], [1.]]).unwrap();
        let post = conjugate(Box::new(Rbf::default()), 0.1);
        let params = FitParams::new().n_iters(5).check().unwrap();
        let res = post.fit(&data, &params, Key::new(0));
        assert!(matches!(res, Err(GpError::NumericalInstabilityError(_))));
    }

    #[test]
    fn test_update_with_grown_dataset() {
        let data = training_data();
        let params = FitParams::new().n_iters(10).check().unwrap();
        let post = conjugate(Box::new(Matern32::default()), 0.1)
            .fit(&data, &params, Key::new(0))
            .unwrap();
        let extra = Dataset::new(&array![[0.6]], &array![[(3.6f64).sin()]]).unwrap();
        let grown = data.concat(&extra).unwrap();
        let updated = post.update(&grown, &params, Key::new(1)).unwrap();
        assert!(updated.predict(&array![[0.6]].view(), &grown).is_ok());
    }

    #[test]
    fn test_with_jitter() {
        let post = conjugate(Box::new(Rbf::default()), 0.1).with_jitter(1e-3);
        assert_eq!(post.prior().config().jitter(), 1e-3);
    }

    fn classification_data() -> Dataset {
        let x = Array::linspace(-2., 2., 12).insert_axis(Axis(1));
        Dataset::from_observations(&x.view(), |x| x.mapv(|v| if v > 0. { 1. } else { 0. })).unwrap()
    }

    #[test]
    fn test_non_conjugate_fit_and_predict() {
        let data = classification_data();
        let post = construct_posterior(
            Prior::new(Box::new(ZeroMean), Box::new(Rbf::new(1., 1.))),
            Likelihood::Bernoulli,
        );
        assert!(post.predict(&array![[0.]].view(), &data).is_err());

        let params = FitParams::new().n_iters(200).check().unwrap();
        let fitted = post.fit(&data, &params, Key::new(3)).unwrap();
        let x = array![[-1.5], [1.5]];
        let (mean, var) = fitted.predict_valvar(&x.view(), &data).unwrap();
        assert!(mean[0] < 0.);
        assert!(mean[1] > 0.);
        let proba = fitted.likelihood().predictive_mean(&mean, &var);
        assert!(proba[0] < 0.5 && proba[1] > 0.5);

        assert!(matches!(
            fitted.sample_approx(1, &data, Key::new(0), 10),
            Err(GpError::NotSupportedError(_))
        ));
    }

    #[test]
    fn test_non_conjugate_update_keeps_latent() {
        let data = classification_data();
        let params = FitParams::new().n_iters(5).check().unwrap();
        let fitted = construct_posterior(Prior::default(), Likelihood::Bernoulli)
            .fit(&data, &params, Key::new(3))
            .unwrap();
        let extra = Dataset::new(&array![[3.]], &array![[1.]]).unwrap();
        let grown = data.concat(&extra).unwrap();
        let no_iter = FitParams::new().n_iters(0).check().unwrap();
        let updated = fitted.clone().update(&grown, &no_iter, Key::new(4)).unwrap();
        match (&fitted, &updated) {
            (Posterior::NonConjugate(before), Posterior::NonConjugate(after)) => {
                assert_eq!(after.latent().len(), grown.n());
                assert_eq!(
                    after.latent().slice(s![..data.n()]),
                    before.latent().view()
                );
            }
            _ => panic!("non conjugate posterior expected"),
        }
    }
}
