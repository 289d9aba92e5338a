//! Chi-squared distribution.
//!
//! `Chi2(df)` is `Gamma(shape = df / 2, rate = 1 / 2)`:
//! `log p(x) = (df/2 - 1) ln x - x/2 - (df/2) ln 2 - lnΓ(df/2)` on `x >= 0`.

use std::any::Any;
use std::f64::consts::LN_2;

use ndarray::{ArrayD, IxDyn};
use rand::RngCore;
use rand_distr::Distribution as _;
use statrs::distribution::{ChiSquared as ChiSquaredCdf, ContinuousCDF};
use statrs::function::gamma::{digamma, gamma_lr, ln_gamma};

use dx_core::shape::{concat_shapes, map2, num_elements};
use dx_core::{Constraint, DType, DistributionConfig, Param, Result};

use crate::bijectors::{Bijector, Elementwise, Softplus};
use crate::distribution::{
    Distribution, Family, ParameterProperties, check_constant, guard_sample, guard_undefined,
    read_param,
};
use crate::math::xlogy;

const DF: &str = "df";

/// Chi-squared distribution with `df` degrees of freedom.
#[derive(Debug, Clone)]
pub struct Chi2 {
    df: Param,
    config: DistributionConfig,
    dtype: DType,
    name: String,
}

impl Chi2 {
    /// Permissive `Chi2(df)`.
    pub fn new(df: impl Into<Param>) -> Result<Self> {
        Self::with_config(df, DistributionConfig::default())
    }

    /// `Chi2(df)` with explicit validation policy.
    ///
    /// A constant `df` is checked here when `validate_args` is set; a
    /// [`dx_core::Variable`] is checked on every use instead.
    pub fn with_config(df: impl Into<Param>, config: DistributionConfig) -> Result<Self> {
        let df = df.into();
        check_constant(&config, DF, &df, Constraint::Positive)?;
        Ok(Self { df, config, dtype: DType::F64, name: Family::Chi2.name().to_string() })
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

    /// Degrees of freedom.
    pub fn df(&self) -> &Param {
        &self.df
    }

    pub(crate) fn df_value(&self) -> Result<ArrayD<f64>> {
        read_param(&self.config, DF, &self.df, Constraint::Positive)
    }

    /// `KL(self || other)`, broadcast over both batches.
    pub fn kl_divergence_to(&self, other: &Chi2) -> Result<ArrayD<f64>> {
        let a = self.df_value()?;
        let b = other.df_value()?;
        map2(&a, &b, |a, b| {
            ln_gamma(0.5 * b) - ln_gamma(0.5 * a) + 0.5 * (a - b) * digamma(0.5 * a)
        })
    }
}

fn log_prob_scalar(df: f64, x: f64) -> f64 {
    if x < 0.0 || x == f64::INFINITY {
        return f64::NEG_INFINITY;
    }
    let h = 0.5 * df;
    xlogy(h - 1.0, x) - 0.5 * x - h * LN_2 - ln_gamma(h)
}

fn cdf_scalar(df: f64, x: f64) -> f64 {
    if df.is_nan() || x.is_nan() || df <= 0.0 || df.is_infinite() {
        return f64::NAN;
    }
    if x <= 0.0 {
        0.0
    } else if x.is_infinite() {
        1.0
    } else {
        gamma_lr(0.5 * df, 0.5 * x)
    }
}

fn quantile_scalar(df: f64, p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    match ChiSquaredCdf::new(df) {
        Ok(_) if p == 0.0 => 0.0,
        Ok(_) if p == 1.0 => f64::INFINITY,
        Ok(d) => d.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

impl Distribution for Chi2 {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> Family {
        Family::Chi2
    }

    fn config(&self) -> &DistributionConfig {
        &self.config
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn batch_shape(&self) -> Result<Vec<usize>> {
        Ok(self.df.shape())
    }

    fn event_shape(&self) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }

    fn parameter_properties(&self) -> Vec<ParameterProperties> {
        vec![ParameterProperties { name: DF, constraint: Constraint::Positive, event_ndims: 0 }]
    }

    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let df = self.df_value()?;
        guard_sample(&self.config, x.iter().any(|&v| v < 0.0), "Sample must be non-negative.")?;
        map2(&df, x, log_prob_scalar)
    }

    fn log_cdf(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let df = self.df_value()?;
        guard_sample(&self.config, x.iter().any(|&v| v < 0.0), "Sample must be non-negative.")?;
        map2(&df, x, |k, v| cdf_scalar(k, v).ln())
    }

    fn quantile(&self, p: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let df = self.df_value()?;
        map2(&df, p, quantile_scalar)
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
        let df = self.df_value()?;
        let n = num_elements(sample_shape);
        let mut out = Vec::with_capacity(n * df.len());
        for _ in 0..n {
            for &k in df.iter() {
                let v = match rand_distr::ChiSquared::new(k) {
                    Ok(d) => d.sample(rng),
                    Err(_) => f64::NAN,
                };
                out.push(self.dtype.cast(v));
            }
        }
        let shape = concat_shapes(&[sample_shape, df.shape()]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn mean(&self) -> Result<ArrayD<f64>> {
        self.df_value()
    }

    fn variance(&self) -> Result<ArrayD<f64>> {
        Ok(self.df_value()?.mapv(|k| 2.0 * k))
    }

    /// Scalar events: the covariance is the variance.
    fn covariance(&self) -> Result<ArrayD<f64>> {
        self.variance()
    }

    fn mode(&self) -> Result<ArrayD<f64>> {
        let df = self.df_value()?;
        guard_undefined(&self.config, df.iter().any(|&k| k.is_nan() || k <= 2.0), || {
            "mode of Chi2 is undefined for `df <= 2`".to_string()
        })?;
        Ok(df.mapv(|k| if k > 2.0 { k - 2.0 } else { f64::NAN }))
    }

    fn entropy(&self) -> Result<ArrayD<f64>> {
        Ok(self.df_value()?.mapv(|k| {
            let h = 0.5 * k;
            h + LN_2 + ln_gamma(h) + (1.0 - h) * digamma(h)
        }))
    }

    fn default_event_space_bijector(&self) -> Result<Box<dyn Bijector>> {
        Ok(Box::new(Elementwise::new(Softplus::default())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
