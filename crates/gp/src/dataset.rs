use crate::errors::{GpError, Result};
use ndarray::{concatenate, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Observations as aligned `x` (n, d) inputs and `y` (n, m) outputs.
///
/// A dataset is immutable: [`Dataset::concat`] returns a new dataset and leaves
/// its operands untouched. The default dataset is empty and has no dimension yet,
/// it is the neutral element of the concatenation.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
}

impl Dataset {
    /// Dataset from `x` (n, d) inputs and `y` (n, m) outputs
    pub fn new(
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        y: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(GpError::DimensionMismatchError(format!(
                "x has {} rows while y has {} rows",
                x.nrows(),
                y.nrows()
            )));
        }
        Ok(Dataset {
            x: x.to_owned(),
            y: y.to_owned(),
        })
    }

    /// Dataset built by observing `f` at the `x` points
    pub fn from_observations<Fun>(x: &ArrayView2<f64>, f: Fun) -> Result<Self>
    where
        Fun: Fn(&ArrayView2<f64>) -> Array2<f64>,
    {
        let y = f(x);
        Dataset::new(x, &y)
    }

    /// Input points as a (n, d) matrix
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Output values as a (n, m) matrix
    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// Number of observations
    pub fn n(&self) -> usize {
        self.x.nrows()
    }

    /// Dimension of input points
    pub fn in_dim(&self) -> usize {
        self.x.ncols()
    }

    /// Dimension of output values
    pub fn out_dim(&self) -> usize {
        self.y.ncols()
    }

    /// Whether the dataset holds no observation
    pub fn is_empty(&self) -> bool {
        self.n() == 0
    }

    fn is_dimensionless(&self) -> bool {
        self.is_empty() && self.in_dim() == 0 && self.out_dim() == 0
    }

    /// New dataset made of the observations of `self` followed by the ones of `other`
    pub fn concat(&self, other: &Dataset) -> Result<Dataset> {
        if other.is_dimensionless() {
            return Ok(self.clone());
        }
        if self.is_dimensionless() {
            return Ok(other.clone());
        }
        if self.in_dim() != other.in_dim() || self.out_dim() != other.out_dim() {
            return Err(GpError::DimensionMismatchError(format!(
                "cannot concatenate dataset (d={}, m={}) with dataset (d={}, m={})",
                self.in_dim(),
                self.out_dim(),
                other.in_dim(),
                other.out_dim()
            )));
        }
        Ok(Dataset {
            x: concatenate![Axis(0), self.x, other.x],
            y: concatenate![Axis(0), self.y, other.y],
        })
    }

    /// Smallest value of the first output with its row index, `None` when empty
    pub fn y_min(&self) -> Option<(usize, f64)> {
        if self.out_dim() == 0 {
            return None;
        }
        self.y
            .column(0)
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best, (i, &v)| match best {
                Some((_, b)) if b <= v => best,
                _ => Some((i, v)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset(x: Array2<f64>, y: Array2<f64>) -> Dataset {
        Dataset::new(&x, &y).expect("valid dataset")
    }

    #[test]
    fn test_new_checks_rows() {
        let res = Dataset::new(&array![[1.], [2.]], &array![[1.]]);
        assert!(matches!(res, Err(GpError::DimensionMismatchError(_))));
    }

    #[test]
    fn test_concat_is_associative_and_ordered() {
        let d1 = dataset(array![[1., 1.]], array![[10.]]);
        let d2 = dataset(array![[2., 2.], [3., 3.]], array![[20.], [30.]]);
        let d3 = dataset(array![[4., 4.]], array![[40.]]);

        let left = d1.concat(&d2).unwrap().concat(&d3).unwrap();
        let right = d1.concat(&d2.concat(&d3).unwrap()).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.y(), &array![[10.], [20.], [30.], [40.]]);
        assert_eq!(left.x().column(0), array![1., 2., 3., 4.]);
        // operands untouched
        assert_eq!(d1.n(), 1);
        assert_eq!(d2.n(), 2);
    }

    #[test]
    fn test_concat_empty_is_neutral() {
        let d = dataset(array![[1.], [2.]], array![[3.], [4.]]);
        assert_eq!(Dataset::default().concat(&d).unwrap(), d);
        assert_eq!(d.concat(&Dataset::default()).unwrap(), d);
        assert!(Dataset::default().is_empty());
    }

    #[test]
    fn test_concat_dimension_mismatch() {
        let d1 = dataset(array![[1.]], array![[1.]]);
        let d2 = dataset(array![[1., 2.]], array![[1.]]);
        let d3 = dataset(array![[1.]], array![[1., 2.]]);
        assert!(matches!(
            d1.concat(&d2),
            Err(GpError::DimensionMismatchError(_))
        ));
        assert!(matches!(
            d1.concat(&d3),
            Err(GpError::DimensionMismatchError(_))
        ));
    }

    #[test]
    fn test_y_min() {
        let d = dataset(array![[1.], [2.], [3.]], array![[3.], [-1.], [-1.]]);
        assert_eq!(d.y_min(), Some((1, -1.)));
        assert_eq!(Dataset::default().y_min(), None);
    }

    #[test]
    fn test_from_observations() {
        let x = array![[1.], [2.]];
        let d = Dataset::from_observations(&x.view(), |x| x.mapv(|v| v * v)).unwrap();
        assert_eq!(d.y(), &array![[1.], [4.]]);
    }
}
