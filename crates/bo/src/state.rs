//! Implementation of `argmin::State` for the decision making loop
use crate::evaluator::{Datasets, Posteriors, OBJECTIVE};
use argmin::core::{Problem, State, TerminationReason, TerminationStatus};
use gpbox_gp::Key;
use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;

/// Stage of the decision loop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecisionStatus {
    /// Posteriors fitted on the initial datasets, no query made yet
    #[default]
    Initialized,
    /// At least one ask/tell step done
    Iterating,
    /// Step budget exhausted or stop condition met
    Completed,
    /// An unrecoverable error stopped the loop
    Failed,
}

/// Maintains the state from iteration to iteration of the [crate::DecisionMaker].
///
/// Posteriors and datasets are values: each step builds a new state and the
/// previous one stays valid.
#[derive(Clone, Debug)]
pub struct DecisionMakerState {
    /// Stage of the loop
    pub status: DecisionStatus,
    /// Observations by function tag
    pub datasets: Datasets,
    /// Posteriors by function tag, conditioned on `datasets`
    pub posteriors: Posteriors,
    /// Key of the next step
    pub key: Key,

    /// Last query points
    pub param: Option<Array2<f64>>,
    /// Previous query points
    pub prev_param: Option<Array2<f64>>,
    /// Best point observed so far as a (1, d) matrix
    pub best_param: Option<Array2<f64>>,
    /// Previous best point
    pub prev_best_param: Option<Array2<f64>>,

    /// Objective values at the last query points
    pub cost: Option<Array1<f64>>,
    /// Best objective value observed so far
    pub best_cost: f64,
    /// Previous best objective value
    pub prev_best_cost: f64,
    /// Target objective value
    pub target_cost: f64,

    /// Current iteration
    pub iter: u64,
    /// Iteration number of last best cost
    pub last_best_iter: u64,
    /// Maximum number of iterations
    pub max_iters: u64,
    /// Evaluation counts
    pub counts: HashMap<String, u64>,
    /// Time required so far
    pub time: Option<web_time::Duration>,
    /// Termination status
    pub termination_status: TerminationStatus,
}

impl DecisionMakerState {
    /// Sets the datasets
    #[must_use]
    pub fn datasets(mut self, datasets: Datasets) -> Self {
        self.datasets = datasets;
        self
    }

    /// Sets the posteriors
    #[must_use]
    pub fn posteriors(mut self, posteriors: Posteriors) -> Self {
        self.posteriors = posteriors;
        self
    }

    /// Sets the key of the next step
    #[must_use]
    pub fn key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    /// Sets the stage of the loop
    #[must_use]
    pub fn status(mut self, status: DecisionStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the last query points, keeping the previous ones
    #[must_use]
    pub fn param(mut self, param: Array2<f64>) -> Self {
        std::mem::swap(&mut self.prev_param, &mut self.param);
        self.param = Some(param);
        self
    }

    /// Sets the objective values at the last query points
    #[must_use]
    pub fn cost(mut self, cost: Array1<f64>) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sets the target objective value
    #[must_use]
    pub fn target_cost(mut self, target_cost: f64) -> Self {
        self.target_cost = target_cost;
        self
    }

    /// Sets the maximum number of iterations
    #[must_use]
    pub fn max_iters(mut self, iters: u64) -> Self {
        self.max_iters = iters;
        self
    }

    /// Best observed objective point and value
    pub fn best_observation(&self) -> Option<(Array2<f64>, f64)> {
        self.best_param
            .as_ref()
            .map(|x| (x.to_owned(), self.best_cost))
    }

    /// Gap between the best observed value and the known `minimum`
    pub fn regret(&self, minimum: f64) -> f64 {
        self.best_cost - minimum
    }

    /// Decimal logarithm of the regret, floored to keep it finite
    pub fn log_regret(&self, minimum: f64) -> f64 {
        self.regret(minimum).max(f64::MIN_POSITIVE).log10()
    }
}

impl State for DecisionMakerState {
    /// Type of parameter vector
    type Param = Array2<f64>;
    /// Floating point precision
    type Float = f64;

    /// Create new `DecisionMakerState` instance
    fn new() -> Self {
        DecisionMakerState {
            status: DecisionStatus::Initialized,
            datasets: Datasets::new(),
            posteriors: Posteriors::new(),
            key: Key::default(),

            param: None,
            prev_param: None,
            best_param: None,
            prev_best_param: None,

            cost: None,
            best_cost: f64::INFINITY,
            prev_best_cost: f64::INFINITY,
            target_cost: f64::NEG_INFINITY,

            iter: 0,
            last_best_iter: 0,
            max_iters: u64::MAX,
            counts: HashMap::new(),
            time: Some(web_time::Duration::new(0, 0)),
            termination_status: TerminationStatus::NotTerminated,
        }
    }

    /// Updates the best point from the objective observations.
    ///
    /// The last best iteration moves only when a strictly better value shows up.
    fn update(&mut self) {
        let best = self.datasets.get(OBJECTIVE).and_then(|data| {
            data.y_min()
                .map(|(i, y)| (data.x().row(i).to_owned().insert_axis(Axis(0)), y))
        });
        if let Some((x, y)) = best {
            if self.best_param.is_none() {
                self.best_param = Some(x);
                self.best_cost = y;
            } else if y < self.best_cost {
                std::mem::swap(&mut self.prev_best_param, &mut self.best_param);
                self.best_param = Some(x);
                self.prev_best_cost = self.best_cost;
                self.best_cost = y;
                self.last_best_iter = self.iter + 1;
            }
        }
    }

    fn get_param(&self) -> Option<&Array2<f64>> {
        self.param.as_ref()
    }

    fn get_best_param(&self) -> Option<&Array2<f64>> {
        self.best_param.as_ref()
    }

    fn terminate_with(mut self, reason: TerminationReason) -> Self {
        self.termination_status = TerminationStatus::Terminated(reason);
        self
    }

    fn time(&mut self, time: Option<web_time::Duration>) -> &mut Self {
        self.time = time;
        self
    }

    /// Minimum of the objective values at the last query points
    fn get_cost(&self) -> f64 {
        self.cost
            .as_ref()
            .map(|c| c.fold(f64::INFINITY, |acc, &v| acc.min(v)))
            .unwrap_or(f64::INFINITY)
    }

    fn get_best_cost(&self) -> f64 {
        self.best_cost
    }

    fn get_target_cost(&self) -> f64 {
        self.target_cost
    }

    fn get_iter(&self) -> u64 {
        self.iter
    }

    fn get_last_best_iter(&self) -> u64 {
        self.last_best_iter
    }

    fn get_max_iters(&self) -> u64 {
        self.max_iters
    }

    fn get_termination_status(&self) -> &TerminationStatus {
        &self.termination_status
    }

    fn get_termination_reason(&self) -> Option<&TerminationReason> {
        match &self.termination_status {
            TerminationStatus::Terminated(reason) => Some(reason),
            TerminationStatus::NotTerminated => None,
        }
    }

    fn get_time(&self) -> Option<web_time::Duration> {
        self.time
    }

    fn increment_iter(&mut self) {
        self.iter += 1;
    }

    fn func_counts<O>(&mut self, problem: &Problem<O>) {
        for (k, &v) in problem.counts.iter() {
            let count = self.counts.entry(k.to_string()).or_insert(0);
            *count = v
        }
    }

    fn get_func_counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    /// last best iteration is 1-based while iter is 0-based
    fn is_best(&self) -> bool {
        self.last_best_iter == self.iter + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpbox_gp::Dataset;
    use ndarray::array;

    fn state_with(x: Array2<f64>, y: Array2<f64>) -> DecisionMakerState {
        let mut datasets = Datasets::new();
        datasets.insert(OBJECTIVE.to_string(), Dataset::new(&x, &y).unwrap());
        DecisionMakerState::new().datasets(datasets)
    }

    #[test]
    fn test_new_state() {
        let state = DecisionMakerState::new();
        assert_eq!(state.status, DecisionStatus::Initialized);
        assert_eq!(state.get_best_cost(), f64::INFINITY);
        assert_eq!(state.get_cost(), f64::INFINITY);
        assert!(state.get_termination_reason().is_none());
        assert!(state.best_observation().is_none());
    }

    #[test]
    fn test_update_best() {
        let mut state = state_with(array![[0.], [1.], [2.]], array![[3.], [1.], [2.]]);
        state.update();
        assert_eq!(state.best_observation(), Some((array![[1.]], 1.)));
        // best of the initial data is not an improvement
        assert_eq!(state.get_last_best_iter(), 0);

        let data = state.datasets[OBJECTIVE]
            .concat(&Dataset::new(&array![[3.]], &array![[0.5]]).unwrap())
            .unwrap();
        let mut datasets = Datasets::new();
        datasets.insert(OBJECTIVE.to_string(), data);
        let mut state = state.datasets(datasets);
        state.update();
        assert_eq!(state.best_observation(), Some((array![[3.]], 0.5)));
        assert_eq!(state.prev_best_cost, 1.);
        assert_eq!(state.get_last_best_iter(), 1);
        assert!(state.is_best());
        // idempotent
        state.update();
        assert_eq!(state.prev_best_cost, 1.);
        assert_eq!(state.best_cost, 0.5);
    }

    #[test]
    fn test_regret() {
        let mut state = state_with(array![[0.], [1.]], array![[-0.5], [1.]]);
        state.update();
        assert_eq!(state.regret(-1.), 0.5);
        assert!((state.log_regret(-1.) - 0.5f64.log10()).abs() < 1e-12);
        assert!(state.log_regret(-0.5).is_finite());
    }

    #[test]
    fn test_param_history() {
        let state = DecisionMakerState::new()
            .param(array![[0.1]])
            .param(array![[0.2]])
            .cost(array![2., -1.]);
        assert_eq!(state.get_param(), Some(&array![[0.2]]));
        assert_eq!(state.prev_param, Some(array![[0.1]]));
        assert_eq!(state.get_cost(), -1.);
    }
}
