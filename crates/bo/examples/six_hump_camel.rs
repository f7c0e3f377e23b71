use gpbox_bo::{
    AcquisitionFunctionBuilder, ContinuousAcquisitionMaximizer, ContinuousTestFunction,
    DecisionMaker, ExpectedImprovement, FunctionEvaluator, MaximizerConfig, PosteriorHandler,
    SamplingStrategy, SixHumpCamel, ThompsonSampling, OBJECTIVE,
};
use gpbox_gp::kernels::Matern52;
use gpbox_gp::mean_functions::ConstantMean;
use gpbox_gp::{FitParams, Key, Likelihood, Prior};
use std::collections::BTreeMap;

/// Log regret reached by `builder` after 10 iterations starting from 11 Halton points
fn log_regret(builder: Box<dyn AcquisitionFunctionBuilder>, seed: u64) -> f64 {
    let f = SixHumpCamel;
    let data = f
        .generate_dataset(11, Key::new(seed), SamplingStrategy::ScrambledHalton)
        .expect("initial doe");
    let prior = Prior::new(Box::<ConstantMean>::default(), Box::<Matern52>::default());
    let handler = PosteriorHandler::new(
        prior,
        |_n| Likelihood::gaussian(1e-6),
        FitParams::new().n_iters(100),
    )
    .expect("valid handler");
    let maximizer = ContinuousAcquisitionMaximizer::from_config(
        MaximizerConfig::default()
            .num_initial_points(500)
            .num_restarts(4)
            .sampling_strategy(SamplingStrategy::ScrambledHalton),
    )
    .expect("valid maximizer");

    let maker = DecisionMaker::new(
        f.search_space(),
        BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
        BTreeMap::from([(OBJECTIVE.to_string(), data)]),
        builder,
        Box::new(maximizer),
    )
    .expect("decision maker configured")
    .key(Key::new(seed));

    let evaluator = FunctionEvaluator::default()
        .with_fallible_function(OBJECTIVE, move |x| Ok(f.evaluate(x)?));
    let state = maker.run(evaluator, 10).expect("Minimization of six hump camel");
    state.log_regret(f.minimum())
}

fn main() {
    for seed in 0..3 {
        let thompson = log_regret(Box::new(ThompsonSampling::new(500).expect("features")), seed);
        let ei = log_regret(Box::<ExpectedImprovement>::default(), seed);
        println!("seed {seed}: log regret thompson = {thompson:.3}, ei = {ei:.3}");
    }
}
