use approx::assert_abs_diff_eq;
use env_logger::{Builder, Env};
use gpbox::bo::{
    ContinuousAcquisitionMaximizer, ContinuousTestFunction, DecisionMaker, DecisionStatus,
    Forrester, FunctionEvaluator, PosteriorHandler, SamplingStrategy, SearchSpace, SixHumpCamel,
    ThompsonSampling, GPBOX_LOG, OBJECTIVE,
};
use gpbox::gp::kernels::Matern52;
use gpbox::gp::mean_functions::ConstantMean;
use gpbox::gp::{Dataset, FitParams, Key, Likelihood, Prior};
use ndarray::ArrayView2;
use serial_test::serial;
use std::collections::BTreeMap;

fn init_logger() {
    let env = Env::new().filter_or(GPBOX_LOG, "warn");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();
}

fn thompson_maker<F: ContinuousTestFunction>(f: &F, data: Dataset, key: Key) -> DecisionMaker {
    let prior = Prior::new(Box::<ConstantMean>::default(), Box::<Matern52>::default());
    let handler = PosteriorHandler::new(
        prior,
        |_n| Likelihood::gaussian(1e-6),
        FitParams::new().n_iters(100),
    )
    .expect("valid handler");
    DecisionMaker::new(
        f.search_space(),
        BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
        BTreeMap::from([(OBJECTIVE.to_string(), data)]),
        Box::new(ThompsonSampling::new(500).expect("valid features")),
        Box::new(ContinuousAcquisitionMaximizer::new(500, 1).expect("valid maximizer")),
    )
    .expect("decision maker configured")
    .key(key)
}

fn evaluator<F: ContinuousTestFunction + Copy + 'static>(f: F) -> FunctionEvaluator {
    FunctionEvaluator::default()
        .with_fallible_function(OBJECTIVE, move |x: &ArrayView2<f64>| Ok(f.evaluate(x)?))
}

#[test]
#[serial]
fn test_forrester_thompson_sampling() {
    init_logger();
    let f = Forrester;
    let data = f
        .generate_dataset(5, Key::new(0), SamplingStrategy::Halton)
        .expect("initial doe");
    let (_, initial_best) = data.y_min().expect("observations");

    let maker = thompson_maker(&f, data, Key::new(42));
    let state = maker.run(evaluator(f), 5).expect("Forrester minimized");

    assert_eq!(state.status, DecisionStatus::Completed);
    let observations = &state.datasets[OBJECTIVE];
    assert_eq!(observations.n(), 10);
    let space = f.search_space();
    assert!(observations.x().rows().into_iter().all(|x| space.contains(&x)));

    let (x_best, y_best) = state.best_observation().expect("best observation");
    assert!(y_best <= initial_best);
    assert!(y_best >= f.minimum() - 1e-9);
    assert_abs_diff_eq!(
        y_best,
        f.evaluate(&x_best.view()).expect("evaluation")[[0, 0]],
        epsilon = 1e-12
    );

    // the run is reproducible from its key
    let other = maker.run(evaluator(f), 5).expect("Forrester minimized");
    assert_eq!(observations, &other.datasets[OBJECTIVE]);
}

#[test]
#[serial]
fn test_six_hump_camel_beats_random_search() {
    init_logger();
    let f = SixHumpCamel;
    let space = f.search_space();
    let (n_init, n_iters) = (11, 5);

    let mut bo_log_regrets = Vec::new();
    let mut rs_log_regrets = Vec::new();
    for seed in 0..5 {
        // initial doe made of the first points of the random search
        let x_rs = space.sample(n_init + n_iters, Key::new(seed)).expect("random search");
        let y_rs = f.evaluate(&x_rs.view()).expect("evaluation");
        let rs_best = y_rs.fold(f64::INFINITY, |acc, &v| acc.min(v));
        rs_log_regrets.push((rs_best - f.minimum()).max(f64::MIN_POSITIVE).log10());

        let x_init = space.sample(n_init, Key::new(seed)).expect("initial doe");
        let data = Dataset::new(&x_init, &f.evaluate(&x_init.view()).expect("evaluation"))
            .expect("initial dataset");
        let state = thompson_maker(&f, data, Key::new(100 + seed))
            .run(evaluator(f), n_iters as u64)
            .expect("six hump camel minimized");
        assert_eq!(state.datasets[OBJECTIVE].n(), n_init + n_iters);
        bo_log_regrets.push(state.log_regret(f.minimum()));
    }

    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
    let (bo, rs) = (mean(&bo_log_regrets), mean(&rs_log_regrets));
    println!("mean log regret: decision maker {bo:.3}, random search {rs:.3}");
    assert!(bo < rs);
}
