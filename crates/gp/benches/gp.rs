use criterion::{criterion_group, criterion_main, Criterion};
use gpbox_gp::kernels::Rbf;
use gpbox_gp::mean_functions::ZeroMean;
use gpbox_gp::{construct_posterior, Dataset, FitParams, Key, Likelihood, Prior};
use linfa::ParamGuard;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn training_data(nt: usize, dim: usize) -> Dataset {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let xt = Array2::random_using((nt, dim), Uniform::new(0., 1.), &mut rng);
    Dataset::from_observations(&xt.view(), |x| {
        x.map_axis(Axis(1), |row| row.mapv(|v| (6. * v).sin()).sum())
            .insert_axis(Axis(1))
    })
    .expect("valid dataset")
}

fn criterion_gp(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp");
    group.sample_size(10);
    let params = FitParams::new().n_iters(20).check().expect("valid params");
    for (nt, dim) in [(20, 1), (50, 5)] {
        let data = training_data(nt, dim);
        let posterior = construct_posterior(
            Prior::new(Box::new(ZeroMean), Box::new(Rbf::default())),
            Likelihood::gaussian(1e-2),
        );
        group.bench_function(format!("fit-{nt}-points-{dim}-dim"), |b| {
            b.iter(|| {
                std::hint::black_box(
                    posterior
                        .clone()
                        .fit(&data, &params, Key::new(0))
                        .expect("GP fitting"),
                )
            });
        });

        let xtest = Array1::linspace(0., 1., 1000)
            .insert_axis(Axis(1))
            .broadcast((1000, dim))
            .expect("broadcast")
            .to_owned();
        group.bench_function(format!("sample-approx-{nt}-points-{dim}-dim"), |b| {
            b.iter(|| {
                let paths = posterior
                    .sample_approx(10, &data, Key::new(0), 500)
                    .expect("GP sampling");
                std::hint::black_box(paths.evaluate(&xtest.view()).expect("path evaluation"))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_gp);
criterion_main!(benches);
