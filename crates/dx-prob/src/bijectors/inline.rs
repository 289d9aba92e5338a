use std::fmt;
use std::sync::Arc;

use ndarray::ArrayD;

use dx_core::Result;
use dx_core::shape::sum_trailing;

use super::{Bijector, check_event_ndims};

type ArrayFn = Arc<dyn Fn(&ArrayD<f64>) -> Result<ArrayD<f64>> + Send + Sync>;
type ShapeFn = Arc<dyn Fn(&[usize]) -> Result<Vec<usize>> + Send + Sync>;

/// Bijector assembled from closures.
///
/// `inverse_log_det_jacobian_fn` returns the log-det for each minimal event
/// (an array shaped like `y` minus its trailing `forward_min_event_ndims`
/// axes); larger `event_ndims` are summed on top of that.
#[derive(Clone)]
pub struct Inline {
    name: String,
    forward_min_event_ndims: usize,
    forward_fn: ArrayFn,
    inverse_fn: ArrayFn,
    inverse_log_det_jacobian_fn: ArrayFn,
    forward_event_shape_fn: Option<ShapeFn>,
    inverse_event_shape_fn: Option<ShapeFn>,
}

impl Inline {
    /// Build from forward, inverse and inverse-log-det closures.
    pub fn new<F, I, J>(
        name: impl Into<String>,
        forward_min_event_ndims: usize,
        forward_fn: F,
        inverse_fn: I,
        inverse_log_det_jacobian_fn: J,
    ) -> Self
    where
        F: Fn(&ArrayD<f64>) -> Result<ArrayD<f64>> + Send + Sync + 'static,
        I: Fn(&ArrayD<f64>) -> Result<ArrayD<f64>> + Send + Sync + 'static,
        J: Fn(&ArrayD<f64>) -> Result<ArrayD<f64>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            forward_min_event_ndims,
            forward_fn: Arc::new(forward_fn),
            inverse_fn: Arc::new(inverse_fn),
            inverse_log_det_jacobian_fn: Arc::new(inverse_log_det_jacobian_fn),
            forward_event_shape_fn: None,
            inverse_event_shape_fn: None,
        }
    }

    /// Override the event-shape mappings (for bijectors that change event size).
    pub fn with_event_shape_fns<F, I>(mut self, forward: F, inverse: I) -> Self
    where
        F: Fn(&[usize]) -> Result<Vec<usize>> + Send + Sync + 'static,
        I: Fn(&[usize]) -> Result<Vec<usize>> + Send + Sync + 'static,
    {
        self.forward_event_shape_fn = Some(Arc::new(forward));
        self.inverse_event_shape_fn = Some(Arc::new(inverse));
        self
    }

    fn reduce_ildj(&self, y: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        check_event_ndims(self, y.ndim(), event_ndims)?;
        let per_event = (self.inverse_log_det_jacobian_fn)(y)?;
        sum_trailing(per_event, event_ndims - self.forward_min_event_ndims)
    }
}

impl fmt::Debug for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inline")
            .field("name", &self.name)
            .field("forward_min_event_ndims", &self.forward_min_event_ndims)
            .finish_non_exhaustive()
    }
}

impl Bijector for Inline {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward_min_event_ndims(&self) -> usize {
        self.forward_min_event_ndims
    }

    fn forward_event_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match &self.forward_event_shape_fn {
            Some(f) => f(input),
            None => Ok(input.to_vec()),
        }
    }

    fn inverse_event_shape(&self, output: &[usize]) -> Result<Vec<usize>> {
        match &self.inverse_event_shape_fn {
            Some(f) => f(output),
            None => Ok(output.to_vec()),
        }
    }

    fn forward(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        (self.forward_fn)(x)
    }

    fn inverse(&self, y: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        (self.inverse_fn)(y)
    }

    fn forward_log_det_jacobian(&self, x: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        let y = self.forward(x)?;
        Ok(self.reduce_ildj(&y, event_ndims)?.mapv(|v| -v))
    }

    fn inverse_log_det_jacobian(&self, y: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        self.reduce_ildj(y, event_ndims)
    }
}
