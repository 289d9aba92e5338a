//! von Mises-Fisher distribution on the unit sphere `S^{d-1}` in `R^d`.
//!
//! Density with respect to the surface measure:
//! `p(x) = C_d(κ) exp(κ μᵀx)` with
//! `ln C_d(κ) = v ln κ - (v + 1) ln 2π - ln I_v(κ)`, `v = d/2 - 1`.
//! At `κ = 0` the distribution is uniform on the sphere.

use std::any::Any;
use std::f64::consts::PI;

use log::debug;
use ndarray::{ArrayD, IxDyn};
use rand::distr::Open01;
use rand::{Rng, RngCore};
use rand_distr::{Beta, Distribution as _, StandardNormal};

use dx_core::constraint::{UNIT_NORM_TOL, all_unit_norm};
use dx_core::shape::{
    broadcast_shapes, broadcast_to, broadcast_view, concat_shapes, map2, map3, num_elements,
    sum_trailing,
};
use dx_core::{Constraint, DType, DistributionConfig, Error, Param, Result};

use crate::bijectors::{Bijector, Stereographic};
use crate::distribution::{
    Distribution, Family, ParameterProperties, check_constant, guard_sample, read_param,
};
use crate::math::sigmoid;
use crate::special::{log_bessel_i, log_sphere_area};
use crate::spherical_uniform::SphericalUniform;

const MEAN_DIRECTION: &str = "mean_direction";
const CONCENTRATION: &str = "concentration";

/// Upper bound on proposals per draw in Wood's rejection sampler.
pub const MAX_REJECTION_ROUNDS: usize = 1000;

/// von Mises-Fisher distribution.
#[derive(Debug, Clone)]
pub struct VonMisesFisher {
    mean_direction: Param,
    concentration: Param,
    config: DistributionConfig,
    dtype: DType,
    name: String,
}

/// Parameter values broadcast to the batch shape.
struct Snapshot {
    /// `batch + [dim]`, row-major.
    mu: Vec<f64>,
    /// `batch`.
    kappa: ArrayD<f64>,
    batch: Vec<usize>,
    dim: usize,
}

impl Snapshot {
    fn rows(&self) -> impl Iterator<Item = (&[f64], f64)> {
        // `chunks(0)` panics, and an empty event has no rows anyway.
        self.mu.chunks(self.dim.max(1)).zip(self.kappa.iter().copied())
    }

    fn mu_array(&self) -> Result<ArrayD<f64>> {
        let shape = concat_shapes(&[&self.batch, &[self.dim]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), self.mu.clone())?)
    }
}

fn event_dim(shape: &[usize]) -> Result<usize> {
    shape.last().copied().ok_or_else(|| {
        Error::Shape(format!("`{MEAN_DIRECTION}` must have rank >= 1, got a scalar"))
    })
}

/// Shape error unless the innermost dimension of `x` equals `dim`.
pub(crate) fn check_innermost(x: &ArrayD<f64>, dim: usize) -> Result<()> {
    match x.shape().last() {
        Some(&n) if n == dim => Ok(()),
        _ => Err(Error::Shape(format!(
            "Input `x` must have innermost dimension matching the event size {}; got shape {:?}",
            dim,
            x.shape()
        ))),
    }
}

/// `ln C_d(κ)`.
pub fn log_normalizer(kappa: f64, dim: usize) -> f64 {
    let d = dim as f64;
    if kappa == 0.0 {
        return -log_sphere_area(d);
    }
    let v = 0.5 * d - 1.0;
    v * kappa.ln() - (v + 1.0) * (2.0 * PI).ln() - log_bessel_i(v, kappa)
}

/// Mean resultant length `A_d(κ) = I_{d/2}(κ) / I_{d/2-1}(κ)`.
pub fn mean_resultant_length(kappa: f64, dim: usize) -> f64 {
    if kappa == 0.0 {
        return 0.0;
    }
    let v = 0.5 * dim as f64;
    (log_bessel_i(v, kappa) - log_bessel_i(v - 1.0, kappa)).exp()
}

impl VonMisesFisher {
    /// Permissive `VonMisesFisher(mean_direction, concentration)`.
    pub fn new(mean_direction: impl Into<Param>, concentration: impl Into<Param>) -> Result<Self> {
        Self::with_config(mean_direction, concentration, DistributionConfig::default())
    }

    /// Construct with explicit validation policy.
    ///
    /// `mean_direction` must have rank >= 1 regardless of `validate_args`.
    pub fn with_config(
        mean_direction: impl Into<Param>,
        concentration: impl Into<Param>,
        config: DistributionConfig,
    ) -> Result<Self> {
        let mean_direction = mean_direction.into();
        let concentration = concentration.into();
        check_constant(&config, MEAN_DIRECTION, &mean_direction, Constraint::UnitVector)?;
        check_constant(&config, CONCENTRATION, &concentration, Constraint::NonNegative)?;
        let mu_shape = mean_direction.shape();
        event_dim(&mu_shape)?;
        broadcast_shapes(&mu_shape[..mu_shape.len() - 1], &concentration.shape())?;
        Ok(Self {
            mean_direction,
            concentration,
            config,
            dtype: DType::F64,
            name: Family::VonMisesFisher.name().to_string(),
        })
    }

    /// Set the sample dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Set the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mean direction `μ`.
    pub fn mean_direction(&self) -> &Param {
        &self.mean_direction
    }

    /// Concentration `κ`.
    pub fn concentration(&self) -> &Param {
        &self.concentration
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let mu = read_param(&self.config, MEAN_DIRECTION, &self.mean_direction, Constraint::UnitVector)?;
        let kappa = read_param(&self.config, CONCENTRATION, &self.concentration, Constraint::NonNegative)?;
        let dim = event_dim(mu.shape())?;
        let batch = broadcast_shapes(&mu.shape()[..mu.ndim() - 1], kappa.shape())?;
        let full = concat_shapes(&[&batch, &[dim]]);
        let mu = broadcast_view(&mu, &full)?.iter().copied().collect();
        let kappa = broadcast_to(&kappa, &batch)?;
        Ok(Snapshot { mu, kappa, batch, dim })
    }

    /// `KL(self || other)` between two vMF batches of the same event size.
    pub fn kl_divergence_to(&self, other: &VonMisesFisher) -> Result<ArrayD<f64>> {
        let p = self.snapshot()?;
        let q = other.snapshot()?;
        if p.dim != q.dim {
            return Err(Error::Shape(format!(
                "KL between von Mises-Fisher distributions of event sizes {} and {}",
                p.dim, q.dim
            )));
        }
        let d = p.dim;
        let dot = sum_trailing(map2(&p.mu_array()?, &q.mu_array()?, |a, b| a * b)?, 1)?;
        let log_c_q = q.kappa.mapv(|k| log_normalizer(k, d));
        let a_p = p.kappa.mapv(|k| mean_resultant_length(k, d));
        let own = map2(&p.kappa, &a_p, |k, a| log_normalizer(k, d) + k * a)?;
        let cross = map3(&a_p, &q.kappa, &dot, |a, k, t| a * k * t)?;
        map3(&own, &log_c_q, &cross, |o, c, x| o - c - x)
    }

    /// `KL(self || SphericalUniform)` on a sphere of the same dimension.
    pub fn kl_divergence_to_uniform(&self, other: &SphericalUniform) -> Result<ArrayD<f64>> {
        let p = self.snapshot()?;
        if p.dim != other.dimension() {
            return Err(Error::Shape(format!(
                "KL between a von Mises-Fisher of event size {} and a spherical uniform of dimension {}",
                p.dim,
                other.dimension()
            )));
        }
        let d = p.dim;
        let log_area = log_sphere_area(d as f64);
        let kl = p.kappa.mapv(|k| {
            if k == 0.0 {
                0.0
            } else {
                log_normalizer(k, d) + k * mean_resultant_length(k, d) + log_area
            }
        });
        let batch = broadcast_shapes(&p.batch, other.batch())?;
        broadcast_to(&kl, &batch)
    }

    fn covariance_row(mu: &[f64], kappa: f64, out: &mut [f64]) {
        let d = mu.len();
        let df = d as f64;
        if kappa == 0.0 {
            for i in 0..d {
                out[i * d + i] = 1.0 / df;
            }
            return;
        }
        let a = mean_resultant_length(kappa, d);
        let diag = a / kappa;
        let outer = 1.0 - df * diag - a * a;
        for i in 0..d {
            for j in 0..d {
                out[i * d + j] = outer * mu[i] * mu[j];
            }
            out[i * d + i] += diag;
        }
    }
}

/// Component of a draw along the mean direction.
fn sample_w(kappa: f64, dim: usize, rng: &mut dyn RngCore) -> f64 {
    match dim {
        1 => {
            let u: f64 = rng.random();
            if u < sigmoid(2.0 * kappa) { 1.0 } else { -1.0 }
        }
        3 => {
            let u: f64 = rng.sample(Open01);
            if kappa == 0.0 {
                2.0 * u - 1.0
            } else {
                1.0 + ((1.0 - u) * (-2.0 * kappa).exp_m1()).ln_1p() / kappa
            }
        }
        _ => sample_w_wood(kappa, dim, rng),
    }
}

/// Wood (1994), "Simulation of the von Mises Fisher distribution".
fn sample_w_wood(kappa: f64, dim: usize, rng: &mut dyn RngCore) -> f64 {
    let dm1 = (dim - 1) as f64;
    let b = dm1 / (2.0 * kappa + (4.0 * kappa * kappa + dm1 * dm1).sqrt());
    let x0 = (1.0 - b) / (1.0 + b);
    let c = kappa * x0 + dm1 * (1.0 - x0 * x0).ln();
    let beta = match Beta::new(0.5 * dm1, 0.5 * dm1) {
        Ok(beta) => beta,
        Err(_) => return f64::NAN,
    };
    let mut last = f64::NAN;
    for _ in 0..MAX_REJECTION_ROUNDS {
        let z: f64 = beta.sample(rng);
        let w = (1.0 - (1.0 + b) * z) / (1.0 - (1.0 - b) * z);
        let u: f64 = rng.sample(Open01);
        if kappa * w + dm1 * (1.0 - x0 * w).ln() - c >= u.ln() {
            return w;
        }
        last = w;
    }
    debug!(
        "vmf: no acceptance after {} proposals (kappa = {}, dim = {}); using last proposal",
        MAX_REJECTION_ROUNDS, kappa, dim
    );
    last
}

/// One draw around `mu`, written to `out`.
///
/// The draw is built around `e1 = (1, 0, ..., 0)` and then mapped onto `mu`
/// by the Householder reflection that swaps the two.
fn sample_row(mu: &[f64], kappa: f64, rng: &mut dyn RngCore, out: &mut [f64]) {
    let d = mu.len();
    if kappa.is_nan() || kappa < 0.0 || mu.iter().any(|m| m.is_nan()) {
        out.iter_mut().for_each(|o| *o = f64::NAN);
        return;
    }
    let w = sample_w(kappa, d, rng);
    out[0] = w;
    if d > 1 {
        let mut norm2 = 0.0;
        while norm2 == 0.0 {
            for o in out[1..].iter_mut() {
                *o = rng.sample(StandardNormal);
            }
            norm2 = out[1..].iter().map(|v| v * v).sum();
        }
        let scale = (1.0 - w * w).max(0.0).sqrt() / norm2.sqrt();
        out[1..].iter_mut().for_each(|o| *o *= scale);
    }

    let mut u: Vec<f64> = mu.iter().map(|m| -m).collect();
    u[0] += 1.0;
    let u2: f64 = u.iter().map(|v| v * v).sum();
    if u2 < 1e-24 {
        return;
    }
    let proj = 2.0 * u.iter().zip(out.iter()).map(|(a, b)| a * b).sum::<f64>() / u2;
    for (o, ui) in out.iter_mut().zip(u.iter()) {
        *o -= proj * ui;
    }
}

impl Distribution for VonMisesFisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> Family {
        Family::VonMisesFisher
    }

    fn config(&self) -> &DistributionConfig {
        &self.config
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn batch_shape(&self) -> Result<Vec<usize>> {
        let mu = self.mean_direction.shape();
        event_dim(&mu)?;
        broadcast_shapes(&mu[..mu.len() - 1], &self.concentration.shape())
    }

    fn event_shape(&self) -> Result<Vec<usize>> {
        Ok(vec![event_dim(&self.mean_direction.shape())?])
    }

    fn parameter_properties(&self) -> Vec<ParameterProperties> {
        vec![
            ParameterProperties {
                name: MEAN_DIRECTION,
                constraint: Constraint::UnitVector,
                event_ndims: 1,
            },
            ParameterProperties {
                name: CONCENTRATION,
                constraint: Constraint::NonNegative,
                event_ndims: 0,
            },
        ]
    }

    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        check_innermost(x, s.dim)?;
        guard_sample(&self.config, !all_unit_norm(x, UNIT_NORM_TOL), "Samples must be unit length.")?;
        let dot = sum_trailing(map2(x, &s.mu_array()?, |a, b| a * b)?, 1)?;
        let log_c = s.kappa.mapv(|k| log_normalizer(k, s.dim));
        map3(&dot, &s.kappa, &log_c, |t, k, c| if k == 0.0 { c } else { k * t + c })
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        let n = num_elements(sample_shape);
        let mut out = vec![0.0; n * s.mu.len()];
        if s.dim > 0 {
            let mut chunks = out.chunks_mut(s.dim);
            for _ in 0..n {
                for ((mu, kappa), row) in s.rows().zip(chunks.by_ref()) {
                    sample_row(mu, kappa, rng, row);
                }
            }
        }
        out.iter_mut().for_each(|v| *v = self.dtype.cast(*v));
        let shape = concat_shapes(&[sample_shape, &s.batch, &[s.dim]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn mean(&self) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        let mut out = Vec::with_capacity(s.mu.len());
        for (mu, kappa) in s.rows() {
            let a = mean_resultant_length(kappa, s.dim);
            out.extend(mu.iter().map(|m| a * m));
        }
        let shape = concat_shapes(&[&s.batch, &[s.dim]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn covariance(&self) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        let d = s.dim;
        let mut out = vec![0.0; s.kappa.len() * d * d];
        if d > 0 {
            for ((mu, kappa), block) in s.rows().zip(out.chunks_mut(d * d)) {
                Self::covariance_row(mu, kappa, block);
            }
        }
        let shape = concat_shapes(&[&s.batch, &[d, d]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn variance(&self) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        let d = s.dim;
        let mut out = Vec::with_capacity(s.mu.len());
        let mut block = vec![0.0; d * d];
        for (mu, kappa) in s.rows() {
            block.iter_mut().for_each(|b| *b = 0.0);
            Self::covariance_row(mu, kappa, &mut block);
            out.extend((0..d).map(|i| block[i * d + i]));
        }
        let shape = concat_shapes(&[&s.batch, &[d]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn mode(&self) -> Result<ArrayD<f64>> {
        self.snapshot()?.mu_array()
    }

    fn entropy(&self) -> Result<ArrayD<f64>> {
        let s = self.snapshot()?;
        let d = s.dim;
        Ok(s.kappa.mapv(|k| {
            if k == 0.0 {
                log_sphere_area(d as f64)
            } else {
                -(log_normalizer(k, d) + k * mean_resultant_length(k, d))
            }
        }))
    }

    fn default_event_space_bijector(&self) -> Result<Box<dyn Bijector>> {
        let d = event_dim(&self.mean_direction.shape())?;
        if d < 2 {
            return Err(Error::NotImplemented(format!(
                "no support bijector for a sphere in R^{d}"
            )));
        }
        Ok(Box::new(Stereographic::new()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
