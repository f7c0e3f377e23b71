//! The ask / evaluate / tell decision loop.
use crate::acquisition::AcquisitionFunctionBuilder;
use crate::errors::{BoError, Result};
use crate::evaluator::{Datasets, FunctionEvaluator, Posteriors, OBJECTIVE};
use crate::maximizer::AcquisitionMaximizer;
use crate::posterior_handler::PosteriorHandler;
use crate::search_space::{ContinuousSearchSpace, SearchSpace};
use crate::state::{DecisionMakerState, DecisionStatus};
use crate::GPBOX_LOG;

use argmin::core::{
    CostFunction, Executor, OptimizationResult, Problem, Solver, State, TerminationReason,
    TerminationStatus, KV,
};
use env_logger::{Builder, Env};
use gpbox_gp::Key;
use log::{debug, info, warn};
use ndarray::{concatenate, Array2, Axis};
use std::collections::BTreeMap;

/// Callback run on the state and the query points returned by [`DecisionMaker::ask`]
pub type PostAskFn = Box<dyn Fn(&DecisionMakerState, &Array2<f64>) + Send + Sync>;
/// Callback run on the state returned by [`DecisionMaker::tell`]
pub type PostTellFn = Box<dyn Fn(&DecisionMakerState) + Send + Sync>;
/// Predicate checked between iterations, the loop stops when it holds
pub type StopFn = Box<dyn Fn(&DecisionMakerState) -> bool + Send + Sync>;

/// Bayesian optimization decision maker.
///
/// It owns one [`PosteriorHandler`] and one initial dataset per function tag, and
/// drives the loop
///
/// * ask: build the acquisition function from the current posteriors and maximize it
///   over the search space to get the next query points,
/// * evaluate the black-box functions at the query points,
/// * tell: append the observations and refit the posteriors.
///
/// Each step draws its randomness from a key split from the state key, so a run is
/// reproducible from the initial key.
///
/// ```no_run
/// # use gpbox_bo::*;
/// # use gpbox_gp::{FitParams, Key, Likelihood, Prior};
/// # use std::collections::BTreeMap;
/// let f = Forrester;
/// let data = f.generate_dataset(5, Key::new(0), SamplingStrategy::Halton).unwrap();
/// let handler = PosteriorHandler::new(
///     Prior::default(),
///     |_n| Likelihood::gaussian(1e-6),
///     FitParams::new(),
/// ).unwrap();
///
/// let maker = DecisionMaker::new(
///     f.search_space(),
///     BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
///     BTreeMap::from([(OBJECTIVE.to_string(), data)]),
///     Box::new(ThompsonSampling::new(100).unwrap()),
///     Box::new(ContinuousAcquisitionMaximizer::new(100, 1).unwrap()),
/// ).unwrap()
/// .key(Key::new(42));
///
/// let evaluator = FunctionEvaluator::default()
///     .with_function(OBJECTIVE, move |x| f.evaluate(x).unwrap());
/// let state = maker.run(evaluator, 10).unwrap();
/// println!("Best observation {:?}", state.best_observation());
/// ```
pub struct DecisionMaker {
    search_space: ContinuousSearchSpace,
    posterior_handlers: BTreeMap<String, PosteriorHandler>,
    datasets: Datasets,
    acquisition_builder: Box<dyn AcquisitionFunctionBuilder>,
    acquisition_maximizer: Box<dyn AcquisitionMaximizer>,
    batch_size: usize,
    key: Key,
    post_ask: Vec<PostAskFn>,
    post_tell: Vec<PostTellFn>,
    stop_when: Option<StopFn>,
}

impl DecisionMaker {
    /// Decision maker over `search_space` modeling each tagged function with its
    /// handler starting from the given initial dataset.
    ///
    /// Fails with [`BoError::InvalidValueError`] when handlers and datasets tags differ,
    /// and with [`BoError::DimensionMismatchError`] when a dataset does not live in the
    /// search space dimension.
    pub fn new(
        search_space: ContinuousSearchSpace,
        posterior_handlers: BTreeMap<String, PosteriorHandler>,
        datasets: Datasets,
        acquisition_builder: Box<dyn AcquisitionFunctionBuilder>,
        acquisition_maximizer: Box<dyn AcquisitionMaximizer>,
    ) -> Result<Self> {
        let env = Env::new().filter_or(GPBOX_LOG, "info");
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        check_tags(posterior_handlers.keys(), datasets.keys(), "initial datasets")?;
        if let Some((tag, data)) = datasets
            .iter()
            .find(|(_, data)| !data.is_empty() && data.in_dim() != search_space.dimensionality())
        {
            return Err(BoError::DimensionMismatchError(format!(
                "dataset {tag} of input dimension {} in a search space of dimension {}",
                data.in_dim(),
                search_space.dimensionality()
            )));
        }
        Ok(DecisionMaker {
            search_space,
            posterior_handlers,
            datasets,
            acquisition_builder,
            acquisition_maximizer,
            batch_size: 1,
            key: Key::default(),
            post_ask: Vec::new(),
            post_tell: Vec::new(),
            stop_when: None,
        })
    }

    /// Sets the number of query points of one step, each built from an independent key
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the initial key of [`DecisionMaker::run`]
    pub fn key(mut self, key: Key) -> Self {
        self.key = key;
        self
    }

    /// Adds a callback run after each ask
    pub fn post_ask<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DecisionMakerState, &Array2<f64>) + Send + Sync + 'static,
    {
        self.post_ask.push(Box::new(callback));
        self
    }

    /// Adds a callback run after each tell
    pub fn post_tell<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DecisionMakerState) + Send + Sync + 'static,
    {
        self.post_tell.push(Box::new(callback));
        self
    }

    /// Sets a stop condition checked between iterations
    pub fn stop_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&DecisionMakerState) -> bool + Send + Sync + 'static,
    {
        self.stop_when = Some(Box::new(predicate));
        self
    }

    /// Search space of the query points
    pub fn search_space(&self) -> &ContinuousSearchSpace {
        &self.search_space
    }

    /// Fits one posterior per tag on the initial datasets
    pub fn initialize(&self, key: Key) -> Result<DecisionMakerState> {
        self.initialize_state(DecisionMakerState::new(), key)
    }

    fn initialize_state(
        &self,
        state: DecisionMakerState,
        key: Key,
    ) -> Result<DecisionMakerState> {
        self.check_batch_size()?;
        let (fit_key, loop_key) = key.split();
        let keys = fit_key.split_n(self.posterior_handlers.len());
        let posteriors = self
            .posterior_handlers
            .iter()
            .zip(keys)
            .map(|((tag, handler), key)| {
                let posterior = handler.get_posterior(&self.datasets[tag], true, key)?;
                Ok((tag.clone(), posterior))
            })
            .collect::<Result<Posteriors>>()?;
        let mut state = state
            .datasets(self.datasets.clone())
            .posteriors(posteriors)
            .key(loop_key)
            .status(DecisionStatus::Initialized);
        state.update();
        Ok(state)
    }

    /// Next query points as a (batch_size, d) matrix
    pub fn ask(&self, state: &DecisionMakerState, key: Key) -> Result<Array2<f64>> {
        self.check_batch_size()?;
        if state.status == DecisionStatus::Failed {
            return Err(BoError::InvalidValueError(
                "cannot ask from a failed state".to_string(),
            ));
        }
        let points = key
            .split_n(self.batch_size)
            .into_iter()
            .map(|key| {
                let (acq_key, opt_key) = key.split();
                let acquisition =
                    self.acquisition_builder
                        .build(&state.posteriors, &state.datasets, acq_key)?;
                self.acquisition_maximizer
                    .maximize(acquisition.as_ref(), &self.search_space, opt_key)
            })
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = points.iter().map(|x| x.view()).collect();
        let x = concatenate(Axis(0), &views).map_err(|err| {
            BoError::DimensionMismatchError(format!("inconsistent query points: {err}"))
        })?;
        debug!("{} asks x={}", self.acquisition_builder.name(), x);
        self.post_ask.iter().for_each(|callback| callback(state, &x));
        Ok(x)
    }

    /// New state holding the `observations` appended to the datasets and the refitted posteriors
    pub fn tell(
        &self,
        state: &DecisionMakerState,
        observations: Datasets,
        key: Key,
    ) -> Result<DecisionMakerState> {
        check_tags(
            self.posterior_handlers.keys(),
            observations.keys(),
            "observations",
        )?;
        let keys = key.split_n(self.posterior_handlers.len());
        let mut datasets = Datasets::new();
        let mut posteriors = Posteriors::new();
        for ((tag, handler), key) in self.posterior_handlers.iter().zip(keys) {
            let previous = state.posteriors.get(tag).ok_or_else(|| {
                BoError::InvalidValueError(format!("no posterior for {tag}, state not initialized"))
            })?;
            let data = match state.datasets.get(tag) {
                Some(data) => data.concat(&observations[tag])?,
                None => observations[tag].clone(),
            };
            let posterior = handler.update_posterior(&data, previous, true, key)?;
            datasets.insert(tag.clone(), data);
            posteriors.insert(tag.clone(), posterior);
        }

        let mut new_state = state
            .clone()
            .datasets(datasets)
            .posteriors(posteriors)
            .status(DecisionStatus::Iterating);
        if let Some(obs) = observations.get(OBJECTIVE) {
            new_state = new_state
                .param(obs.x().to_owned())
                .cost(obs.y().column(0).to_owned());
        }
        new_state.update();
        self.post_tell
            .iter()
            .for_each(|callback| callback(&new_state));
        Ok(new_state)
    }

    /// Runs `n_steps` ask / evaluate / tell iterations from the initial datasets.
    ///
    /// When an iteration fails the loop stops and [`BoError::IterationFailed`] is returned
    /// holding the last consistent state with a [`DecisionStatus::Failed`] status.
    pub fn run(&self, evaluator: FunctionEvaluator, n_steps: u64) -> Result<DecisionMakerState> {
        check_tags(self.posterior_handlers.keys(), evaluator.tags(), "evaluated functions")?;
        let solver = DecisionLoop {
            maker: self,
            failure: None,
        };
        let OptimizationResult { solver, state, .. } = Executor::new(evaluator, solver)
            .configure(|state| state.max_iters(n_steps))
            .run()?;

        match solver.failure {
            Some(source) => Err(BoError::IterationFailed {
                source: Box::new(source),
                state: Box::new(state),
            }),
            None => {
                info!(
                    "Decision loop completed after {} iterations: best fun(x={:?})={}",
                    state.get_iter(),
                    state.best_param.as_ref().map(|x| x.row(0).to_vec()),
                    state.get_best_cost()
                );
                Ok(state.status(DecisionStatus::Completed))
            }
        }
    }

    /// One ask / evaluate / tell iteration
    fn step(
        &self,
        problem: &mut Problem<FunctionEvaluator>,
        state: &DecisionMakerState,
    ) -> Result<DecisionMakerState> {
        let (next_key, iter_key) = state.key.split();
        let (ask_key, tell_key) = iter_key.split();
        let x = self.ask(state, ask_key)?;
        let observations = problem
            .problem("cost_count", |evaluator| evaluator.cost(&x))
            .map_err(|err| err.downcast::<BoError>().unwrap_or_else(BoError::ArgminError))?;
        Ok(self.tell(state, observations, tell_key)?.key(next_key))
    }

    fn check_batch_size(&self) -> Result<()> {
        if self.batch_size < 1 {
            return Err(BoError::InvalidValueError(
                "batch size should be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_tags<'a>(
    expected: impl Iterator<Item = &'a String>,
    actual: impl Iterator<Item = &'a String>,
    what: &str,
) -> Result<()> {
    let expected: Vec<_> = expected.collect();
    let actual: Vec<_> = actual.collect();
    if expected != actual {
        return Err(BoError::InvalidValueError(format!(
            "{what} tags {actual:?} do not match posterior handlers tags {expected:?}"
        )));
    }
    Ok(())
}

/// Drives a [`DecisionMaker`] with the `argmin` executor, keeping the error which stopped it
struct DecisionLoop<'a> {
    maker: &'a DecisionMaker,
    failure: Option<BoError>,
}

impl DecisionLoop<'_> {
    fn fail(&mut self, state: DecisionMakerState, err: BoError, reason: &str) -> DecisionMakerState {
        warn!("{reason}: {err}");
        self.failure = Some(err);
        state
            .status(DecisionStatus::Failed)
            .terminate_with(TerminationReason::SolverExit(reason.to_string()))
    }
}

impl Solver<FunctionEvaluator, DecisionMakerState> for DecisionLoop<'_> {
    const NAME: &'static str = "DecisionMaker";

    fn init(
        &mut self,
        _problem: &mut Problem<FunctionEvaluator>,
        state: DecisionMakerState,
    ) -> std::result::Result<(DecisionMakerState, Option<KV>), argmin::core::Error> {
        let initial = state.clone();
        match self.maker.initialize_state(state, self.maker.key) {
            Ok(state) => {
                info!(
                    "Decision loop initialized with {} on {} observations",
                    self.maker.acquisition_builder.name(),
                    state.datasets.get(OBJECTIVE).map_or(0, |data| data.n())
                );
                Ok((state, None))
            }
            Err(err) => Ok((self.fail(initial, err, "initialization failed"), None)),
        }
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<FunctionEvaluator>,
        state: DecisionMakerState,
    ) -> std::result::Result<(DecisionMakerState, Option<KV>), argmin::core::Error> {
        debug!(
            "********* Start iteration {}/{}",
            state.get_iter() + 1,
            state.get_max_iters()
        );
        let now = web_time::Instant::now();
        match self.maker.step(problem, &state) {
            Ok(new_state) => {
                info!(
                    "********* End iteration {}/{} in {:.3}s: Best fun(x={:?})={}",
                    state.get_iter() + 1,
                    state.get_max_iters(),
                    now.elapsed().as_secs_f64(),
                    new_state.best_param.as_ref().map(|x| x.row(0).to_vec()),
                    new_state.get_best_cost()
                );
                Ok((new_state, None))
            }
            Err(err) => Ok((self.fail(state, err, "iteration failed"), None)),
        }
    }

    fn terminate(&mut self, state: &DecisionMakerState) -> TerminationStatus {
        match &self.maker.stop_when {
            Some(stop) if stop(state) => {
                info!("Stop condition met at iteration {}", state.get_iter());
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}
