//! Distribution parameters: immutable constants and shared mutable variables.
//!
//! A [`Variable`] is a handle to a shared array. Every distribution holding
//! a clone of the handle observes `assign` immediately; there is no snapshot
//! isolation. Distributions therefore read a parameter once per public call
//! ([`Param::value`]) and validate that snapshot before computing with it.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array, Array1, Array2, ArrayD, Dimension};
use parking_lot::RwLock;

use crate::shape::scalar;

/// Shared, mutable array parameter.
#[derive(Clone)]
pub struct Variable {
    inner: Arc<RwLock<ArrayD<f64>>>,
}

impl Variable {
    /// Create a variable holding `value`.
    pub fn new(value: impl IntoArray) -> Self {
        Self { inner: Arc::new(RwLock::new(value.into_array())) }
    }

    /// Replace the held value. The shape may change.
    pub fn assign(&self, value: impl IntoArray) {
        *self.inner.write() = value.into_array();
    }

    /// Copy of the current value.
    pub fn read(&self) -> ArrayD<f64> {
        self.inner.read().clone()
    }

    /// Shape of the current value.
    pub fn shape(&self) -> Vec<usize> {
        self.inner.read().shape().to_vec()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable").field("value", &*self.inner.read()).finish()
    }
}

/// A distribution parameter.
#[derive(Debug, Clone)]
pub enum Param {
    /// Fixed value, validated once at construction.
    Constant(ArrayD<f64>),
    /// Mutable value, validated on every use.
    Variable(Variable),
}

impl Param {
    /// Snapshot of the current value.
    pub fn value(&self) -> ArrayD<f64> {
        match self {
            Param::Constant(a) => a.clone(),
            Param::Variable(v) => v.read(),
        }
    }

    /// Current shape.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Param::Constant(a) => a.shape().to_vec(),
            Param::Variable(v) => v.shape(),
        }
    }

    /// `true` when backed by a [`Variable`].
    pub fn is_variable(&self) -> bool {
        matches!(self, Param::Variable(_))
    }
}

/// Anything that can become a dynamic-rank `f64` array.
///
/// Lets `Param` and `Variable` constructors accept scalars, vectors,
/// fixed-size (nested) arrays and `ndarray` arrays uniformly.
pub trait IntoArray {
    /// Convert into an `ArrayD<f64>`.
    fn into_array(self) -> ArrayD<f64>;
}

impl IntoArray for f64 {
    fn into_array(self) -> ArrayD<f64> {
        scalar(self)
    }
}

impl IntoArray for Vec<f64> {
    fn into_array(self) -> ArrayD<f64> {
        Array1::from(self).into_dyn()
    }
}

impl IntoArray for &[f64] {
    fn into_array(self) -> ArrayD<f64> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl<const N: usize> IntoArray for [f64; N] {
    fn into_array(self) -> ArrayD<f64> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl<const R: usize, const C: usize> IntoArray for [[f64; C]; R] {
    fn into_array(self) -> ArrayD<f64> {
        Array2::from(self.to_vec()).into_dyn()
    }
}

impl<D: Dimension> IntoArray for Array<f64, D> {
    fn into_array(self) -> ArrayD<f64> {
        self.into_dyn()
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Constant(v.into_array())
    }
}

impl From<Vec<f64>> for Param {
    fn from(v: Vec<f64>) -> Self {
        Param::Constant(v.into_array())
    }
}

impl From<&[f64]> for Param {
    fn from(v: &[f64]) -> Self {
        Param::Constant(v.into_array())
    }
}

impl<const N: usize> From<[f64; N]> for Param {
    fn from(v: [f64; N]) -> Self {
        Param::Constant(v.into_array())
    }
}

impl<const R: usize, const C: usize> From<[[f64; C]; R]> for Param {
    fn from(v: [[f64; C]; R]) -> Self {
        Param::Constant(v.into_array())
    }
}

impl<D: Dimension> From<Array<f64, D>> for Param {
    fn from(a: Array<f64, D>) -> Self {
        Param::Constant(a.into_dyn())
    }
}

impl From<Variable> for Param {
    fn from(v: Variable) -> Self {
        Param::Variable(v)
    }
}

impl From<&Variable> for Param {
    fn from(v: &Variable) -> Self {
        Param::Variable(v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_constant_from_scalar_and_vec() {
        let p: Param = 2.5.into();
        assert_eq!(p.shape(), Vec::<usize>::new());
        let q: Param = vec![1.0, 2.0, 3.0].into();
        assert_eq!(q.shape(), vec![3]);
        assert!(!q.is_variable());
    }

    #[test]
    fn test_nested_array_conversion() {
        let p: Param = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]].into();
        assert_eq!(p.shape(), vec![3, 2]);
        assert_eq!(p.value()[[2, 1]], 6.0);
    }

    #[test]
    fn test_variable_mutation_is_shared() {
        let v = Variable::new([1.0, 2.0]);
        let p: Param = (&v).into();
        assert!(p.is_variable());
        v.assign(array![5.0, 6.0, 7.0]);
        assert_eq!(p.shape(), vec![3]);
        assert_eq!(p.value(), array![5.0, 6.0, 7.0].into_dyn());
    }
}
