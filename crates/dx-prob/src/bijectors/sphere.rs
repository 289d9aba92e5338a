use ndarray::ArrayD;

use dx_core::constraint::UNIT_NORM_TOL;
use dx_core::shape::{map_last_axis, reduce_last_axis, sum_trailing};
use dx_core::{Error, Result};

use super::{Bijector, check_event_ndims};

/// Inverse stereographic projection `R^{n} -> S^{n}` (unit sphere in `R^{n+1}`).
///
/// `forward(z) = (2z, |z|^2 - 1) / (|z|^2 + 1)`; the projection point is the
/// north pole `(0, ..., 0, 1)`, which is approached as `|z| -> inf`.
/// `inverse` returns NaN for rows that are not unit length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stereographic;

impl Stereographic {
    /// Create the bijector.
    pub fn new() -> Self {
        Self
    }
}

impl Bijector for Stereographic {
    fn name(&self) -> &str {
        "stereographic"
    }

    fn forward_min_event_ndims(&self) -> usize {
        1
    }

    fn forward_event_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let mut out = input.to_vec();
        match out.last_mut() {
            Some(n) => {
                *n += 1;
                Ok(out)
            }
            None => Err(Error::Shape("stereographic projection needs a vector event".into())),
        }
    }

    fn inverse_event_shape(&self, output: &[usize]) -> Result<Vec<usize>> {
        match output.split_last() {
            Some((&n, rest)) if n >= 1 => {
                let mut out = rest.to_vec();
                out.push(n - 1);
                Ok(out)
            }
            _ => Err(Error::Shape("stereographic projection needs a vector event".into())),
        }
    }

    fn forward(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let n = last_dim(x)?;
        map_last_axis(x, n + 1, |z, out| {
            let r2 = z.dot(&z);
            let denom = r2 + 1.0;
            for (o, &zi) in out.iter_mut().zip(z.iter()) {
                *o = 2.0 * zi / denom;
            }
            out[n] = (r2 - 1.0) / denom;
        })
    }

    fn inverse(&self, y: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let d = last_dim(y)?;
        if d == 0 {
            return Err(Error::Shape("stereographic inverse needs a non-empty event".into()));
        }
        map_last_axis(y, d - 1, |p, out| {
            let norm = p.dot(&p).sqrt();
            if (norm - 1.0).abs() > UNIT_NORM_TOL {
                out.iter_mut().for_each(|o| *o = f64::NAN);
                return;
            }
            let denom = 1.0 - p[d - 1];
            for (o, &pi) in out.iter_mut().zip(p.iter()) {
                *o = pi / denom;
            }
        })
    }

    fn forward_log_det_jacobian(&self, x: &ArrayD<f64>, event_ndims: usize) -> Result<ArrayD<f64>> {
        check_event_ndims(self, x.ndim(), event_ndims)?;
        let n = last_dim(x)? as f64;
        let per_event = reduce_last_axis(x, |z| {
            n * (std::f64::consts::LN_2 - z.dot(&z).ln_1p())
        })?;
        sum_trailing(per_event, event_ndims - 1)
    }
}

fn last_dim(a: &ArrayD<f64>) -> Result<usize> {
    a.shape()
        .last()
        .copied()
        .ok_or_else(|| Error::Shape("expected an array of rank >= 1, got a scalar".into()))
}
