//! Elementwise (scalar) bijectors and the [`Elementwise`] array adapter.
//!
//! Inverses are exact: a value outside the image of `forward` maps to NaN
//! instead of being clamped back into range.

use ndarray::ArrayD;

use dx_core::shape::sum_trailing;
use dx_core::{Constraint, Result};

use super::{Bijector, check_event_ndims};
use crate::math::{log_sigmoid, logit, sigmoid, softplus, softplus_inverse};

/// A bijection from the real line onto an interval, one number at a time.
pub trait ScalarBijector: Send + Sync + std::fmt::Debug {
    /// Short identifier.
    fn name(&self) -> &'static str;
    /// Real line to the constrained interval.
    fn forward(&self, z: f64) -> f64;
    /// Constrained interval back to the real line.
    fn inverse(&self, y: f64) -> f64;
    /// `log |f'(z)|`.
    fn log_abs_det_jacobian(&self, z: f64) -> f64;
}

impl ScalarBijector for Box<dyn ScalarBijector> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn forward(&self, z: f64) -> f64 {
        (**self).forward(z)
    }
    fn inverse(&self, y: f64) -> f64 {
        (**self).inverse(y)
    }
    fn log_abs_det_jacobian(&self, z: f64) -> f64 {
        (**self).log_abs_det_jacobian(z)
    }
}

/// Leaves values unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ScalarBijector for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }
    fn forward(&self, z: f64) -> f64 {
        z
    }
    fn inverse(&self, y: f64) -> f64 {
        y
    }
    fn log_abs_det_jacobian(&self, _z: f64) -> f64 {
        0.0
    }
}

/// `y = lower + exp(z)` onto `(lower, inf)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp {
    lower: f64,
}

impl Exp {
    /// Exponential map shifted to start at `lower`.
    pub fn new(lower: f64) -> Self {
        Self { lower }
    }
}

impl ScalarBijector for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }
    fn forward(&self, z: f64) -> f64 {
        self.lower + z.exp()
    }
    fn inverse(&self, y: f64) -> f64 {
        (y - self.lower).ln()
    }
    fn log_abs_det_jacobian(&self, z: f64) -> f64 {
        z
    }
}

/// `y = lower + softplus(z)` onto `(lower, inf)`.
///
/// Linear growth keeps `forward` finite where `exp` would overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softplus {
    lower: f64,
}

impl Softplus {
    /// Softplus shifted to start at `lower`.
    pub fn new(lower: f64) -> Self {
        Self { lower }
    }
}

impl ScalarBijector for Softplus {
    fn name(&self) -> &'static str {
        "softplus"
    }
    fn forward(&self, z: f64) -> f64 {
        self.lower + softplus(z)
    }
    fn inverse(&self, y: f64) -> f64 {
        softplus_inverse(y - self.lower)
    }
    fn log_abs_det_jacobian(&self, z: f64) -> f64 {
        log_sigmoid(z)
    }
}

/// `y = lower + width * sigmoid(z)` onto `(lower, upper)`.
#[derive(Debug, Clone, Copy)]
pub struct Sigmoid {
    lower: f64,
    width: f64,
}

impl Sigmoid {
    /// Logistic map onto `(lower, upper)`.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, width: upper - lower }
    }

    /// Logistic map onto `(0, 1)`.
    pub fn unit() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl ScalarBijector for Sigmoid {
    fn name(&self) -> &'static str {
        "sigmoid"
    }
    fn forward(&self, z: f64) -> f64 {
        self.lower + self.width * sigmoid(z)
    }
    fn inverse(&self, y: f64) -> f64 {
        logit((y - self.lower) / self.width)
    }
    fn log_abs_det_jacobian(&self, z: f64) -> f64 {
        self.width.ln() + log_sigmoid(z) + log_sigmoid(-z)
    }
}

/// Which map to use for half-bounded domains `(a, inf)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositiveBijectorKind {
    /// `a + exp(z)`.
    #[default]
    Exp,
    /// `a + softplus(z)`.
    Softplus,
}

/// Scalar bijector onto the domain of `constraint`.
///
/// Returns `None` for [`Constraint::UnitVector`], which couples the entries of
/// a row and has no elementwise bijection.
pub fn for_constraint(constraint: Constraint, positive: PositiveBijectorKind) -> Option<Box<dyn ScalarBijector>> {
    let half_line = |lower: f64| -> Box<dyn ScalarBijector> {
        match positive {
            PositiveBijectorKind::Exp => Box::new(Exp::new(lower)),
            PositiveBijectorKind::Softplus => Box::new(Softplus::new(lower)),
        }
    };
    match constraint {
        Constraint::Real => Some(Box::new(Identity)),
        Constraint::Positive | Constraint::NonNegative => Some(half_line(0.0)),
        Constraint::GreaterThan { bound } => Some(half_line(bound)),
        Constraint::UnitInterval => Some(Box::new(Sigmoid::unit())),
        Constraint::UnitVector => None,
    }
}

/// Lifts a [`ScalarBijector`] to arrays.
///
/// Log-det-Jacobians are summed over the trailing `event_ndims` axes.
#[derive(Debug, Clone)]
pub struct Elementwise<B> {
    inner: B,
}

impl<B: ScalarBijector> Elementwise<B> {
    /// Wrap `inner`.
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    /// The wrapped scalar bijector.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: ScalarBijector> Bijector for Elementwise<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn forward_min_event_ndims(&self) -> usize {
        0
    }

    fn forward(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Ok(x.mapv(|v| self.inner.forward(v)))
    }

    fn inverse(&self, y: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Ok(y.mapv(|v| self.inner.inverse(v)))
    }

    fn forward_log_det_jacobian(&self, x: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        check_event_ndims(self, x.ndim(), event_ndims)?;
        sum_trailing(x.mapv(|v| self.inner.log_abs_det_jacobian(v)), event_ndims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_inverts(b: &dyn ScalarBijector, zs: &[f64], tol: f64) {
        for &z in zs {
            let y = b.forward(z);
            let back = b.inverse(y);
            assert!((back - z).abs() <= tol * z.abs().max(1.0), "{}: z={z} y={y} back={back}", b.name());
        }
    }

    #[test]
    fn test_roundtrips() {
        let zs = [-5.0, -1.0, 0.0, 1.0, 3.0];
        assert_inverts(&Identity, &zs, 1e-15);
        assert_inverts(&Exp::default(), &zs, 1e-10);
        assert_inverts(&Exp::new(2.5), &zs, 1e-10);
        assert_inverts(&Softplus::new(2.5), &[-10.0, -1.0, 0.0, 5.0, 10.0], 1e-10);
        assert_inverts(&Sigmoid::new(-5.0, 5.0), &[-10.0, -2.0, 0.0, 2.0, 10.0], 1e-9);
    }

    #[test]
    fn test_log_det_matches_numeric_derivative() {
        let h = 1e-6;
        let maps: [Box<dyn ScalarBijector>; 3] =
            [Box::new(Exp::new(1.0)), Box::new(Softplus::new(2.5)), Box::new(Sigmoid::new(-5.0, 5.0))];
        for b in &maps {
            for z in [-3.0, -0.5, 0.0, 0.7, 3.0] {
                let slope = (b.forward(z + h) - b.forward(z - h)) / (2.0 * h);
                let ladj = b.log_abs_det_jacobian(z);
                assert!((ladj - slope.ln()).abs() < 1e-6, "{} at z={z}: {ladj} vs {}", b.name(), slope.ln());
            }
        }
    }

    #[test]
    fn test_inverse_outside_image_is_nan() {
        assert!(Exp::default().inverse(-1.0).is_nan());
        assert!(Exp::new(2.0).inverse(1.0).is_nan());
        assert!(Softplus::default().inverse(-0.1).is_nan());
        assert!(Sigmoid::unit().inverse(1.2).is_nan());
        assert!(Sigmoid::unit().inverse(-0.2).is_nan());
    }

    #[test]
    fn test_inverse_at_boundary_is_infinite() {
        assert_eq!(Softplus::new(2.5).inverse(2.5), f64::NEG_INFINITY);
        assert_eq!(Sigmoid::unit().inverse(0.0), f64::NEG_INFINITY);
        assert_eq!(Sigmoid::unit().inverse(1.0), f64::INFINITY);
    }

    #[test]
    fn test_sigmoid_stays_in_bounds() {
        let b = Sigmoid::new(0.0, 10.0);
        for z in [-100.0, -10.0, 0.0, 10.0, 100.0] {
            assert!((0.0..=10.0).contains(&b.forward(z)), "z={z}");
        }
    }

    #[test]
    fn test_for_constraint_selection() {
        let pick = |c, k| for_constraint(c, k).map(|b| b.name());
        assert_eq!(pick(Constraint::Real, PositiveBijectorKind::Exp), Some("identity"));
        assert_eq!(pick(Constraint::Positive, PositiveBijectorKind::Exp), Some("exp"));
        assert_eq!(pick(Constraint::NonNegative, PositiveBijectorKind::Softplus), Some("softplus"));
        assert_eq!(pick(Constraint::UnitInterval, PositiveBijectorKind::Exp), Some("sigmoid"));
        assert_eq!(pick(Constraint::UnitVector, PositiveBijectorKind::Exp), None);

        let b = for_constraint(Constraint::GreaterThan { bound: 1.0 }, PositiveBijectorKind::Softplus).unwrap();
        assert!(b.forward(-10.0) > 1.0);
        assert!(b.forward(1000.0).is_finite());
    }

    #[test]
    fn test_elementwise_sums_over_event_dims() {
        let b = Elementwise::new(Exp::default());
        let x = ndarray::array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        let fldj = b.forward_log_det_jacobian(&x, 1).unwrap();
        assert_eq!(fldj, ndarray::array![3.0, 7.0].into_dyn());
        let ildj = b.inverse_log_det_jacobian(&b.forward(&x).unwrap(), 1).unwrap();
        assert!((ildj[[0]] + 3.0).abs() < 1e-12);
        assert!(b.forward_log_det_jacobian(&x, 3).is_err());
    }
}
