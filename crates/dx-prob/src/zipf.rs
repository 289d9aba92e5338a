//! Zipf (zeta) distribution on the positive integers.
//!
//! `P(X = k) = k^{-power} / ζ(power)` for `k = 1, 2, ...` and `power > 1`.
//!
//! Unless `force_probs_to_zero_outside_support` is set, non-integer inputs
//! are not rounded: `log_prob` evaluates the continuous expression
//! `-power ln x - ln ζ(power)`, which lies between the values at the floor
//! and ceiling of `x`.

use std::any::Any;

use log::debug;
use ndarray::{ArrayD, IxDyn};
use rand::distr::Open01;
use rand::{Rng, RngCore};

use dx_core::shape::{concat_shapes, map2, num_elements};
use dx_core::{Constraint, DType, DistributionConfig, Param, Result};

use crate::distribution::{
    Distribution, Family, ParameterProperties, check_constant, guard_sample, guard_undefined,
    read_param,
};
use crate::special::{hurwitz_zeta, riemann_zeta};

const POWER: &str = "power";
const POWER_CONSTRAINT: Constraint = Constraint::GreaterThan { bound: 1.0 };

/// Upper bound on proposals per draw in the rejection sampler.
pub const MAX_REJECTION_ROUNDS: usize = 1000;

/// Zipf distribution.
#[derive(Debug, Clone)]
pub struct Zipf {
    power: Param,
    config: DistributionConfig,
    dtype: DType,
    name: String,
}

impl Zipf {
    /// Permissive `Zipf(power)` with `I32` samples.
    pub fn new(power: impl Into<Param>) -> Result<Self> {
        Self::with_config(power, DistributionConfig::default())
    }

    /// `Zipf(power)` with explicit validation policy.
    pub fn with_config(power: impl Into<Param>, config: DistributionConfig) -> Result<Self> {
        let power = power.into();
        check_constant(&config, POWER, &power, POWER_CONSTRAINT)?;
        Ok(Self { power, config, dtype: DType::I32, name: Family::Zipf.name().to_string() })
    }

    /// Set the sample dtype. Draws saturate at the dtype's largest value.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Set the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Exponent parameter.
    pub fn power(&self) -> &Param {
        &self.power
    }

    fn power_value(&self) -> Result<ArrayD<f64>> {
        read_param(&self.config, POWER, &self.power, POWER_CONSTRAINT)
    }

    fn check_sample(&self, x: &ArrayD<f64>) -> Result<()> {
        guard_sample(&self.config, x.iter().any(|&v| v < 0.0), "Sample must be non-negative.")?;
        if self.config.force_probs_to_zero_outside_support {
            guard_sample(
                &self.config,
                x.iter().any(|&v| v.is_finite() && v.fract() != 0.0),
                "Sample cannot contain fractional components.",
            )?;
        }
        Ok(())
    }

    fn snap(&self, x: f64) -> f64 {
        if self.config.force_probs_to_zero_outside_support { x.floor() } else { x }
    }
}

/// Devroye's rejection sampler for `Zipf(power)`.
///
/// Proposals are `floor(U^{-1/(power-1)})`; anything at or beyond `max`
/// is returned as `max`.
fn sample_one(power: f64, max: f64, rng: &mut dyn RngCore) -> f64 {
    if power.is_nan() || power <= 1.0 {
        return f64::NAN;
    }
    let am1 = power - 1.0;
    let bm1 = (am1 * std::f64::consts::LN_2).exp_m1();
    let b = bm1 + 1.0;
    let mut last = max;
    for _ in 0..MAX_REJECTION_ROUNDS {
        let u: f64 = rng.sample(Open01);
        let v: f64 = rng.random();
        let x = u.powf(-1.0 / am1).floor();
        if x >= max || x.is_nan() {
            return max;
        }
        let tm1 = (am1 * (1.0 / x).ln_1p()).exp_m1();
        let t = tm1 + 1.0;
        if v * x * tm1 / bm1 <= t / b {
            return x;
        }
        last = x;
    }
    debug!(
        "zipf: no acceptance after {} proposals (power = {}); using last proposal",
        MAX_REJECTION_ROUNDS, power
    );
    last
}

impl Distribution for Zipf {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> Family {
        Family::Zipf
    }

    fn config(&self) -> &DistributionConfig {
        &self.config
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn batch_shape(&self) -> Result<Vec<usize>> {
        Ok(self.power.shape())
    }

    fn event_shape(&self) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }

    fn parameter_properties(&self) -> Vec<ParameterProperties> {
        vec![ParameterProperties { name: POWER, constraint: POWER_CONSTRAINT, event_ndims: 0 }]
    }

    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        self.check_sample(x)?;
        map2(&power, x, |p, x| {
            if x.is_nan() {
                return f64::NAN;
            }
            let safe_x = self.snap(x).max(1.0);
            if x != safe_x {
                return f64::NEG_INFINITY;
            }
            -p * safe_x.ln() - riemann_zeta(p).ln()
        })
    }

    fn log_cdf(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        self.check_sample(x)?;
        map2(&power, x, |p, x| {
            if x.is_nan() {
                return f64::NAN;
            }
            if x < 1.0 {
                return f64::NEG_INFINITY;
            }
            let safe_x = self.snap(x).max(0.0);
            (-hurwitz_zeta(p, safe_x + 1.0) / riemann_zeta(p)).ln_1p()
        })
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        let max = self.dtype.max_value();
        let n = num_elements(sample_shape);
        let mut out = Vec::with_capacity(n * power.len());
        for _ in 0..n {
            for &p in power.iter() {
                out.push(self.dtype.cast(sample_one(p, max, rng)));
            }
        }
        let shape = concat_shapes(&[sample_shape, power.shape()]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn mean(&self) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        guard_undefined(&self.config, power.iter().any(|&p| !(p > 2.0)), || {
            "mean of Zipf is undefined for `power <= 2`".to_string()
        })?;
        Ok(power.mapv(|p| {
            if p > 2.0 {
                riemann_zeta(p - 1.0) / riemann_zeta(p)
            } else if p.is_nan() {
                f64::NAN
            } else {
                f64::INFINITY
            }
        }))
    }

    fn variance(&self) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        guard_undefined(&self.config, power.iter().any(|&p| !(p > 3.0)), || {
            "variance of Zipf is undefined for `power <= 3`".to_string()
        })?;
        Ok(power.mapv(|p| {
            if p > 3.0 {
                let z = riemann_zeta(p);
                let m = riemann_zeta(p - 1.0) / z;
                riemann_zeta(p - 2.0) / z - m * m
            } else if p > 2.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        }))
    }

    fn mode(&self) -> Result<ArrayD<f64>> {
        let power = self.power_value()?;
        Ok(power.mapv(|p| if p.is_nan() { f64::NAN } else { 1.0 }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
