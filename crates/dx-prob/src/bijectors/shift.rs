use ndarray::{ArrayD, IxDyn};

use dx_core::shape::{map2, split_event};
use dx_core::{Param, Result};

use super::{Bijector, check_event_ndims};

/// `y = x + shift`, broadcasting. The log-det-Jacobian is zero.
#[derive(Debug, Clone)]
pub struct Shift {
    shift: Param,
}

impl Shift {
    /// Translate by `shift` (a constant or a [`dx_core::Variable`]).
    pub fn new(shift: impl Into<Param>) -> Self {
        Self { shift: shift.into() }
    }

    /// The translation parameter.
    pub fn shift(&self) -> &Param {
        &self.shift
    }
}

impl Bijector for Shift {
    fn name(&self) -> &str {
        "shift"
    }

    fn forward_min_event_ndims(&self) -> usize {
        0
    }

    fn forward(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        map2(x, &self.shift.value(), |a, b| a + b)
    }

    fn inverse(&self, y: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        map2(y, &self.shift.value(), |a, b| a - b)
    }

    fn forward_log_det_jacobian(&self, x: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        check_event_ndims(self, x.ndim(), event_ndims)?;
        let (outer, _) = split_event(x.shape(), event_ndims)?;
        Ok(ArrayD::zeros(IxDyn(outer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dx_core::Variable;
    use ndarray::array;

    #[test]
    fn test_no_batch() {
        let b = Shift::new([1.0, -1.0]);
        let x = array![1.0, 1.0].into_dyn();
        assert_eq!(b.forward(&x).unwrap(), array![2.0, 0.0].into_dyn());
        assert_eq!(b.inverse(&x).unwrap(), array![0.0, 2.0].into_dyn());
        let ildj = b.inverse_log_det_jacobian(&x, 1).unwrap();
        assert!(ildj.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_batch_shift_broadcasts() {
        let b = Shift::new([[2.0, -0.5], [1.0, -3.0]]);
        let x = array![1.0, 1.0].into_dyn();
        assert_eq!(b.forward(&x).unwrap(), array![[3.0, 0.5], [2.0, -2.0]].into_dyn());
        assert_eq!(b.inverse(&x).unwrap(), array![[-1.0, 1.5], [0.0, 4.0]].into_dyn());
    }

    #[test]
    fn test_variable_shift_tracks_assignment() {
        let v = Variable::new(1.0);
        let b = Shift::new(&v);
        let x = array![0.0].into_dyn();
        assert_eq!(b.forward(&x).unwrap()[[0]], 1.0);
        v.assign(5.0);
        assert_eq!(b.forward(&x).unwrap()[[0]], 5.0);
    }
}
