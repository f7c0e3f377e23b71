use gpbox_doe::{Halton, Random, SamplingMethod};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn main() {
    let xlimits = arr2(&[[0., 1.], [-10., 10.], [5., 15.]]);
    let n = 10;

    println!("Take {n} samples in");
    println!("{xlimits}\n");

    println!("*** using random sampling");
    let samples = Random::new(&xlimits).sample(n);
    println!("{samples}\n");

    println!("*** using halton sequence");
    let samples = Halton::new(&xlimits).sample(n);
    println!("{samples}\n");

    println!("*** using scrambled halton sequence");
    let samples = Halton::new(&xlimits)
        .scrambled(Xoshiro256Plus::seed_from_u64(42))
        .sample(n);
    println!("{samples}\n");
}
