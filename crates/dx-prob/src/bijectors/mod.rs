//! Bijective transforms (bijectors).
//!
//! A [`Bijector`] maps arrays from an unconstrained space onto a constrained
//! one and reports the log-determinant of the Jacobian. Distributions expose
//! one as their support bijector (see
//! [`crate::Distribution::default_event_space_bijector`]); [`ParameterTransform`]
//! moves distribution parameters to unconstrained space.

mod inline;
mod parameter;
mod scalar;
mod shift;
mod sphere;

pub use inline::Inline;
pub use parameter::{ParameterTransform, ParameterTransformOptions};
pub use scalar::{
    Elementwise, Exp, Identity, PositiveBijectorKind, ScalarBijector, Sigmoid, Softplus, for_constraint,
};
pub use shift::Shift;
pub use sphere::Stereographic;

use ndarray::ArrayD;

use dx_core::{Error, Result};

/// A differentiable bijection between array spaces.
pub trait Bijector: Send + Sync + std::fmt::Debug {
    /// Short identifier.
    fn name(&self) -> &str;

    /// Minimum number of trailing dimensions `forward` operates on jointly.
    fn forward_min_event_ndims(&self) -> usize;

    /// Minimum number of trailing dimensions `inverse` operates on jointly.
    fn inverse_min_event_ndims(&self) -> usize {
        self.forward_min_event_ndims()
    }

    /// Event shape of `forward(x)` given the event shape of `x`.
    fn forward_event_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        Ok(input.to_vec())
    }

    /// Event shape of `inverse(y)` given the event shape of `y`.
    fn inverse_event_shape(&self, output: &[usize]) -> Result<Vec<usize>> {
        Ok(output.to_vec())
    }

    /// `y = f(x)`.
    fn forward(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>>;

    /// `x = f^{-1}(y)`. Points outside the image of `forward` map to NaN.
    fn inverse(&self, y: &ArrayD<f64>) -> Result<ArrayD<f64>>;

    /// `log|det J_f(x)|`, reduced over the trailing `event_ndims` axes.
    fn forward_log_det_jacobian(&self, x: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>>;

    /// `log|det J_{f^{-1}}(y)| = -log|det J_f(f^{-1}(y))|`.
    fn inverse_log_det_jacobian(&self, y: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        let x = self.inverse(y)?;
        let fldj = self.forward_log_det_jacobian(&x, event_ndims)?;
        Ok(fldj.mapv(|v| -v))
    }
}

/// Fail unless `min_event_ndims <= event_ndims <= rank`.
pub(crate) fn check_event_ndims<B: Bijector + ?Sized>(
    bijector: &B,
    rank: usize,
    event_ndims: usize,
) -> Result<()> {
    let min = bijector.forward_min_event_ndims();
    if event_ndims < min {
        return Err(Error::Shape(format!(
            "bijector `{}` needs event_ndims >= {}, got {}",
            bijector.name(),
            min,
            event_ndims
        )));
    }
    if event_ndims > rank {
        return Err(Error::Shape(format!(
            "event_ndims {} exceeds input rank {}",
            event_ndims, rank
        )));
    }
    Ok(())
}
