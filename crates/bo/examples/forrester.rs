use gpbox_bo::{
    ContinuousAcquisitionMaximizer, ContinuousTestFunction, DecisionMaker, Forrester,
    FunctionEvaluator, PosteriorHandler, SamplingStrategy, ThompsonSampling, OBJECTIVE,
};
use gpbox_gp::kernels::Matern52;
use gpbox_gp::mean_functions::ConstantMean;
use gpbox_gp::{FitParams, Key, Likelihood, Prior};
use std::collections::BTreeMap;

fn main() {
    let f = Forrester;
    let data = f
        .generate_dataset(5, Key::new(0), SamplingStrategy::Halton)
        .expect("initial doe");

    let prior = Prior::new(Box::<ConstantMean>::default(), Box::<Matern52>::default());
    let handler = PosteriorHandler::new(
        prior,
        |_n| Likelihood::gaussian(1e-6),
        FitParams::new().n_iters(100),
    )
    .expect("valid handler");

    let maker = DecisionMaker::new(
        f.search_space(),
        BTreeMap::from([(OBJECTIVE.to_string(), handler)]),
        BTreeMap::from([(OBJECTIVE.to_string(), data)]),
        Box::new(ThompsonSampling::new(500).expect("valid features")),
        Box::new(ContinuousAcquisitionMaximizer::new(1000, 1).expect("valid maximizer")),
    )
    .expect("decision maker configured")
    .key(Key::new(42))
    .post_tell(|state| {
        if let (Some(x), Some(y)) = (&state.param, &state.cost) {
            println!("Observed {} at x = {}", y[0], x.row(0));
        }
    });

    let evaluator = FunctionEvaluator::default()
        .with_fallible_function(OBJECTIVE, move |x| Ok(f.evaluate(x)?));
    let state = maker.run(evaluator, 10).expect("Minimization of Forrester");
    let (x_best, y_best) = state.best_observation().expect("best observation");
    println!(
        "Minimum Forrester(x) = {} at x = {} (known minimum {} at {})",
        y_best,
        x_best.row(0),
        f.minimum(),
        f.minimizer().row(0)
    );
}
