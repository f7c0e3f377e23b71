//! Black-box function evaluation.
use crate::errors::{BoError, Result};
use argmin::core::CostFunction;
use gpbox_gp::{Dataset, Posterior};
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;

/// Tag of the objective function to be minimized
pub const OBJECTIVE: &str = "OBJECTIVE";

/// Observations by function tag
pub type Datasets = BTreeMap<String, Dataset>;
/// Posteriors by function tag
pub type Posteriors = BTreeMap<String, Posterior>;

/// A black-box function mapping (n, d) points to (n, m) observations
pub type EvalFn = Box<dyn Fn(&ArrayView2<f64>) -> anyhow::Result<Array2<f64>> + Send + Sync>;

/// Evaluates a set of tagged functions at the same query points.
///
/// It is the problem driven by the [`DecisionMaker`](crate::DecisionMaker) loop,
/// evaluations are counted by the `argmin` executor under the `cost_count` key.
#[derive(Default)]
pub struct FunctionEvaluator {
    functions: BTreeMap<String, EvalFn>,
}

/// Builds an evaluator from infallible functions indexed by tag
pub fn build_function_evaluator<F>(functions: BTreeMap<String, F>) -> FunctionEvaluator
where
    F: Fn(&ArrayView2<f64>) -> Array2<f64> + Send + Sync + 'static,
{
    functions
        .into_iter()
        .fold(FunctionEvaluator::default(), |evaluator, (tag, f)| {
            evaluator.with_function(&tag, f)
        })
}

impl FunctionEvaluator {
    /// Adds (or replaces) the function evaluated under `tag`
    pub fn with_function<F>(self, tag: &str, f: F) -> Self
    where
        F: Fn(&ArrayView2<f64>) -> Array2<f64> + Send + Sync + 'static,
    {
        self.with_fallible_function(tag, move |x: &ArrayView2<f64>| Ok(f(x)))
    }

    /// Adds (or replaces) a function which may fail under `tag`
    pub fn with_fallible_function<F>(mut self, tag: &str, f: F) -> Self
    where
        F: Fn(&ArrayView2<f64>) -> anyhow::Result<Array2<f64>> + Send + Sync + 'static,
    {
        self.functions.insert(tag.to_string(), Box::new(f));
        self
    }

    /// Tags of the evaluated functions
    pub fn tags(&self) -> impl Iterator<Item = &String> {
        self.functions.keys()
    }

    /// One dataset per tag holding the observations of the function at `x`
    pub fn evaluate(&self, x: &ArrayView2<f64>) -> Result<Datasets> {
        self.functions
            .iter()
            .map(|(tag, f)| {
                let y = f(x).map_err(|err| {
                    BoError::EvaluationError(format!("function {tag} failed: {err:#}"))
                })?;
                Ok((tag.clone(), Dataset::new(x, &y)?))
            })
            .collect()
    }
}

impl CostFunction for FunctionEvaluator {
    /// Type of the parameter vector
    type Param = Array2<f64>;
    /// Type of the return value computed by the cost function
    type Output = Datasets;

    /// Apply the cost function to a parameter `p`
    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(self.evaluate(&p.view())?)
    }
}
