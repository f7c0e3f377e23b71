use gpbox_gp::kernels::Matern52;
use gpbox_gp::mean_functions::ConstantMean;
use gpbox_gp::{construct_posterior, Dataset, FitParams, Key, Likelihood, Prior};
use linfa::ParamGuard;
use ndarray::{arr2, concatenate, Array, Array2, Axis};

fn xsinx(x: &Array2<f64>) -> Array2<f64> {
    (x - 3.5) * ((x - 3.5) / std::f64::consts::PI).mapv(|v| v.sin())
}

fn main() {
    let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
    let data = Dataset::new(&xt, &xsinx(&xt)).expect("valid dataset");

    println!("Fit GP surrogate of 'xsinx' at {}", xt.column(0));
    let prior = Prior::new(
        Box::new(ConstantMean::default()),
        Box::new(Matern52::new(5., 10.)),
    );
    let params = FitParams::new().n_iters(200).check().expect("valid params");
    let posterior = construct_posterior(prior, Likelihood::gaussian_fixed(1e-6))
        .fit(&data, &params, Key::new(42))
        .expect("GP fitting");
    println!("Fitted kernel: {}", posterior.prior().kernel());

    let xtest = Array::linspace(0., 25., 26).insert_axis(Axis(1));
    let ytest = xsinx(&xtest);
    let (ypred, yvar) = posterior
        .predict_valvar(&xtest.view(), &data)
        .expect("GP prediction");
    let ysigma = yvar.mapv(f64::sqrt);

    println!("Compute prediction errors (x, err(x), sigma(x))");
    println!(
        "{}",
        concatenate![
            Axis(1),
            xtest,
            (ypred - ytest.column(0)).insert_axis(Axis(1)),
            ysigma.insert_axis(Axis(1))
        ]
    );

    let paths = posterior
        .sample_approx(3, &data, Key::new(7), 500)
        .expect("GP sampling");
    println!("Three approximate posterior sample paths");
    println!("{}", paths.evaluate(&xtest.view()).expect("path evaluation"));
}
