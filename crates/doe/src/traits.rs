use linfa::Float;
use ndarray::Array2;

/// A design of experiments generator over a box-shaped sample space.
///
/// The sample space is `[lower_i, upper_i]` for each of the `nx` components,
/// given as a (nx, 2) matrix where the ith row holds the bounds of the ith component.
pub trait SamplingMethod<F: Float> {
    /// Returns the (nx, 2) bounds of the sample space.
    fn sampling_space(&self) -> &Array2<F>;

    /// Generates `ns` samples in the unit hypercube `[0, 1]^nx` as a (ns, nx) matrix.
    fn normalized_sample(&self, ns: usize) -> Array2<F>;

    /// Generates `ns` samples within the sample space as a (ns, nx) matrix.
    ///
    /// Normalized samples are mapped component-wise with `lower + (upper - lower) * u`.
    fn sample(&self, ns: usize) -> Array2<F> {
        let xlimits = self.sampling_space();
        let lower = xlimits.column(0);
        let width = &xlimits.column(1) - &lower;
        self.normalized_sample(ns) * width + lower
    }
}
