//! A module for mean functions used as the prior mean of GP models.
//!
//! The following mean functions are implemented:
//! * zero,
//! * constant.

use dyn_clonable::*;
use ndarray::{array, Array1, ArrayView1, ArrayView2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for mean functions of GP priors
#[clonable]
#[cfg_attr(feature = "serializable", typetag::serde(tag = "type"))]
pub trait MeanFunction: Clone + Send + Sync + fmt::Display {
    /// Mean values at the `x` points given as a (n, nx) matrix
    fn value(&self, x: &ArrayView2<f64>) -> Array1<f64>;

    /// Trainable parameters
    fn params(&self) -> Array1<f64>;

    /// Set trainable parameters, `params` has the length of [`MeanFunction::params`]
    fn set_params(&mut self, params: &ArrayView1<f64>);
}

impl fmt::Debug for dyn MeanFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A zero function as mean of the GP
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ZeroMean;

#[cfg_attr(feature = "serializable", typetag::serde)]
impl MeanFunction for ZeroMean {
    fn value(&self, x: &ArrayView2<f64>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }

    fn params(&self) -> Array1<f64> {
        Array1::zeros(0)
    }

    fn set_params(&mut self, _params: &ArrayView1<f64>) {}
}

impl fmt::Display for ZeroMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Zero")
    }
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConstantMean {
    constant: f64,
}

impl ConstantMean {
    /// Constant mean with the given offset
    pub fn new(constant: f64) -> Self {
        ConstantMean { constant }
    }

    /// Offset value
    pub fn constant(&self) -> f64 {
        self.constant
    }
}

#[cfg_attr(feature = "serializable", typetag::serde)]
impl MeanFunction for ConstantMean {
    fn value(&self, x: &ArrayView2<f64>) -> Array1<f64> {
        Array1::from_elem(x.nrows(), self.constant)
    }

    fn params(&self) -> Array1<f64> {
        array![self.constant]
    }

    fn set_params(&mut self, params: &ArrayView1<f64>) {
        if let Some(c) = params.get(0) {
            self.constant = *c;
        }
    }
}

impl fmt::Display for ConstantMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Constant({})", self.constant)
    }
}
