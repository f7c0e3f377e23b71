use crate::errors::{GpError, Result};
use crate::parameters::FitValidParams;
use finitediff::FiniteDiff;
use log::debug;
use ndarray::{Array1, Zip};

/// Adam first order optimizer state
pub(crate) struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    /// First moment estimates
    m: Array1<f64>,
    /// Second moment estimates
    v: Array1<f64>,
    /// Number of steps taken
    t: i32,
}

impl Adam {
    pub fn new(dim: usize, params: &FitValidParams) -> Self {
        Adam {
            learning_rate: params.learning_rate(),
            beta1: params.beta1(),
            beta2: params.beta2(),
            epsilon: params.epsilon(),
            m: Array1::zeros(dim),
            v: Array1::zeros(dim),
            t: 0,
        }
    }

    /// Update `theta` in place given the gradient of the objective at `theta`
    pub fn step(&mut self, theta: &mut Array1<f64>, grad: &Array1<f64>) {
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        let bias1 = 1. - b1.powi(self.t);
        let bias2 = 1. - b2.powi(self.t);
        let (lr, eps) = (self.learning_rate, self.epsilon);
        Zip::from(theta)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|x, m, v, g| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *x -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

/// Minimize `objective` starting from `theta0` with `n_iters` Adam steps using
/// central finite differences gradients.
///
/// Returns the last iterate and its objective value. Fails with
/// [`GpError::NumericalInstabilityError`] when the objective or its gradient
/// is not finite at one of the iterates.
pub(crate) fn minimize<ObjF>(
    objective: ObjF,
    theta0: Array1<f64>,
    params: &FitValidParams,
) -> Result<(Array1<f64>, f64)>
where
    ObjF: Fn(&Array1<f64>) -> f64,
{
    let f = |x: &Vec<f64>| -> f64 { objective(&Array1::from(x.clone())) };
    let mut theta = theta0;
    let mut adam = Adam::new(theta.len(), params);
    for iter in 0..params.n_iters() {
        let value = objective(&theta);
        if !value.is_finite() {
            return Err(GpError::NumericalInstabilityError(format!(
                "objective value {value} at iteration {iter} for parameters {theta}"
            )));
        }
        let grad = Array1::from(theta.to_vec().central_diff(&f));
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(GpError::NumericalInstabilityError(format!(
                "objective gradient {grad} at iteration {iter} for parameters {theta}"
            )));
        }
        adam.step(&mut theta, &grad);
    }
    let value = objective(&theta);
    if !value.is_finite() {
        return Err(GpError::NumericalInstabilityError(format!(
            "final objective value {value} for parameters {theta}"
        )));
    }
    debug!(
        "Adam fit: objective={} after {} iterations",
        value,
        params.n_iters()
    );
    Ok((theta, value))
}
