//! Acquisition functions: utilities over the search space whose maximizer is the
//! next point to query.
//!
//! Acquisition functions are built from the current posteriors and datasets by an
//! [`AcquisitionFunctionBuilder`]. As the black-box objective is minimized, larger
//! utility values point to more promising candidates.
use crate::errors::{BoError, Result};
use crate::evaluator::{Datasets, Posteriors, OBJECTIVE};
use gpbox_gp::{norm_cdf, norm_pdf, Dataset, Key, Posterior, Predictor, SampleFunction};
use log::debug;
use ndarray::{Array1, ArrayView2, Zip};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A utility function over the search space, larger is better
pub trait AcquisitionFunction: Send + Sync {
    /// Utility values at the points of `x` (n, d)
    fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// A strategy building acquisition functions from posteriors and datasets.
///
/// Builders are configuration only: building never mutates the given posteriors or
/// datasets and two builds with the same inputs and key give the same function.
pub trait AcquisitionFunctionBuilder: Send + Sync {
    /// Name of the strategy
    fn name(&self) -> &'static str;

    /// Acquisition function given current posteriors and datasets indexed by tag
    fn build(
        &self,
        posteriors: &Posteriors,
        datasets: &Datasets,
        key: Key,
    ) -> Result<Box<dyn AcquisitionFunction>>;
}

impl fmt::Debug for dyn AcquisitionFunctionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Checks that the objective posterior and dataset are available
pub fn check_objective_present<'a>(
    posteriors: &'a Posteriors,
    datasets: &'a Datasets,
) -> Result<(&'a Posterior, &'a Dataset)> {
    let posterior = posteriors.get(OBJECTIVE).ok_or_else(|| {
        BoError::InvalidValueError(format!("{OBJECTIVE} posterior not found"))
    })?;
    let dataset = datasets
        .get(OBJECTIVE)
        .ok_or_else(|| BoError::InvalidValueError(format!("{OBJECTIVE} dataset not found")))?;
    Ok((posterior, dataset))
}

/// Thompson sampling: maximize the opposite of one approximate posterior sample path
/// of the objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThompsonSampling {
    num_features: usize,
}

impl ThompsonSampling {
    /// Thompson sampling with sample paths drawn using `num_features` random Fourier features.
    ///
    /// Fails with [`BoError::InvalidValueError`] when `num_features` is zero.
    pub fn new(num_features: usize) -> Result<Self> {
        if num_features == 0 {
            return Err(BoError::InvalidValueError(
                "number of features should be positive".to_string(),
            ));
        }
        Ok(ThompsonSampling { num_features })
    }

    /// Number of random Fourier features of the sample paths
    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

/// Opposite of a single sample path
struct NegatedSamplePath(SampleFunction);

impl AcquisitionFunction for NegatedSamplePath {
    fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let values = self.0.evaluate(x)?;
        Ok(values.column(0).mapv(|v| -v))
    }
}

impl AcquisitionFunctionBuilder for ThompsonSampling {
    fn name(&self) -> &'static str {
        "ThompsonSampling"
    }

    fn build(
        &self,
        posteriors: &Posteriors,
        datasets: &Datasets,
        key: Key,
    ) -> Result<Box<dyn AcquisitionFunction>> {
        let (posterior, dataset) = check_objective_present(posteriors, datasets)?;
        if !posterior.is_conjugate() {
            return Err(BoError::InvalidValueError(
                "Thompson sampling requires a conjugate objective posterior".to_string(),
            ));
        }
        let path = posterior.sample_approx(1, dataset, key, self.num_features)?;
        debug!(
            "Thompson sample path drawn with {} features",
            self.num_features
        );
        Ok(Box::new(NegatedSamplePath(path)))
    }
}

/// Closed form improvement based utility over the objective posterior predictive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImprovementKind {
    Expected,
    Probability,
}

/// Holds the objective posterior conditioned once on the observations
struct Improvement {
    kind: ImprovementKind,
    predictor: Predictor,
    fmin: f64,
    xi: f64,
}

impl AcquisitionFunction for Improvement {
    fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        let (mean, variance) = self.predictor.predict_valvar(x)?;
        let mut values = Array1::zeros(x.nrows());
        Zip::from(&mut values)
            .and(&mean)
            .and(&variance)
            .for_each(|value, &pred, &var| {
                let sigma = var.max(0.).sqrt();
                *value = if sigma < f64::EPSILON {
                    0.
                } else {
                    let improvement = self.fmin - pred - self.xi;
                    let u = improvement / sigma;
                    match self.kind {
                        ImprovementKind::Expected => {
                            (improvement * norm_cdf(u) + sigma * norm_pdf(u)).max(0.)
                        }
                        ImprovementKind::Probability => norm_cdf(u),
                    }
                };
            });
        Ok(values)
    }
}

fn build_improvement(
    kind: ImprovementKind,
    xi: f64,
    posteriors: &Posteriors,
    datasets: &Datasets,
) -> Result<Box<dyn AcquisitionFunction>> {
    let (posterior, dataset) = check_objective_present(posteriors, datasets)?;
    let (_, fmin) = dataset.y_min().ok_or_else(|| {
        BoError::InvalidValueError(format!("{OBJECTIVE} dataset has no observation"))
    })?;
    debug!("{kind:?} improvement over fmin={fmin}");
    Ok(Box::new(Improvement {
        kind,
        predictor: posterior.predictor(dataset)?,
        fmin,
        xi,
    }))
}

fn check_xi(xi: f64) -> Result<f64> {
    if xi.is_finite() && xi >= 0. {
        Ok(xi)
    } else {
        Err(BoError::InvalidValueError(format!(
            "exploration margin should be positive, got {xi}"
        )))
    }
}

/// Expected improvement over the best observed objective value
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedImprovement {
    xi: f64,
}

impl ExpectedImprovement {
    /// Expected improvement with an exploration margin `xi`
    pub fn with_xi(xi: f64) -> Result<Self> {
        Ok(ExpectedImprovement { xi: check_xi(xi)? })
    }
}

impl AcquisitionFunctionBuilder for ExpectedImprovement {
    fn name(&self) -> &'static str {
        "EI"
    }

    fn build(
        &self,
        posteriors: &Posteriors,
        datasets: &Datasets,
        _key: Key,
    ) -> Result<Box<dyn AcquisitionFunction>> {
        build_improvement(ImprovementKind::Expected, self.xi, posteriors, datasets)
    }
}

/// Probability of improvement over the best observed objective value
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityOfImprovement {
    xi: f64,
}

impl ProbabilityOfImprovement {
    /// Probability of improvement with an exploration margin `xi`
    pub fn with_xi(xi: f64) -> Result<Self> {
        Ok(ProbabilityOfImprovement { xi: check_xi(xi)? })
    }
}

impl AcquisitionFunctionBuilder for ProbabilityOfImprovement {
    fn name(&self) -> &'static str {
        "PI"
    }

    fn build(
        &self,
        posteriors: &Posteriors,
        datasets: &Datasets,
        _key: Key,
    ) -> Result<Box<dyn AcquisitionFunction>> {
        build_improvement(ImprovementKind::Probability, self.xi, posteriors, datasets)
    }
}

/// Evaluates `acquisition` at a single point given as a slice
pub(crate) fn evaluate_at(acquisition: &dyn AcquisitionFunction, x: &[f64]) -> Result<f64> {
    let point = ArrayView2::from_shape((1, x.len()), x)
        .map_err(|err| BoError::DimensionMismatchError(err.to_string()))?;
    let values = acquisition.evaluate(&point)?;
    values
        .get(0)
        .copied()
        .ok_or_else(|| BoError::DimensionMismatchError("empty acquisition value".to_string()))
}

/// Best candidate index, the first one in case of ties, NaN values are ignored
pub(crate) fn first_argmax(values: &Array1<f64>) -> Option<usize> {
    values.argmax_skipnan().ok()
}
