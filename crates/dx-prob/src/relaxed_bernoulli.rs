//! RelaxedBernoulli (binary Concrete) distribution.
//!
//! A continuous relaxation of `Bernoulli(probs)` on `[0, 1]`: a draw is
//! `sigmoid((logits + L) / temperature)` with `L ~ Logistic(0, 1)`. As the
//! temperature goes to zero, draws concentrate on `{0, 1}` with
//! `P(x = 1) = probs`.

use std::any::Any;

use ndarray::{ArrayD, IxDyn, Zip};
use rand::distr::Open01;
use rand::{Rng, RngCore};

use dx_core::shape::{broadcast_shapes, broadcast_view, concat_shapes, map3, num_elements};
use dx_core::{Constraint, DType, DistributionConfig, Error, Param, Result};

use crate::bijectors::{Bijector, Elementwise, Sigmoid};
use crate::distribution::{
    Distribution, Family, ParameterProperties, check_constant, guard_sample, read_param,
};
use crate::math::{log_sigmoid, logit, sigmoid, xlogy};

const TEMPERATURE: &str = "temperature";
const PROBS: &str = "probs";
const LOGITS: &str = "logits";

/// The Bernoulli parameter, held in exactly one representation.
#[derive(Debug, Clone)]
pub enum ProbsOrLogits {
    /// `P(x = 1)` in `[0, 1]`.
    Probs(Param),
    /// `ln(p / (1 - p))`, any real.
    Logits(Param),
}

/// RelaxedBernoulli(temperature, probs | logits).
#[derive(Debug, Clone)]
pub struct RelaxedBernoulli {
    temperature: Param,
    param: ProbsOrLogits,
    config: DistributionConfig,
    dtype: DType,
    name: String,
}

impl RelaxedBernoulli {
    /// Construct from exactly one of `probs` / `logits`.
    pub fn new(
        temperature: impl Into<Param>,
        probs: Option<Param>,
        logits: Option<Param>,
        config: DistributionConfig,
    ) -> Result<Self> {
        let param = match (probs, logits) {
            (Some(p), None) => ProbsOrLogits::Probs(p),
            (None, Some(l)) => ProbsOrLogits::Logits(l),
            _ => {
                return Err(Error::Validation("Must pass probs or logits, but not both.".into()));
            }
        };
        let temperature = temperature.into();
        check_constant(&config, TEMPERATURE, &temperature, Constraint::Positive)?;
        if let ProbsOrLogits::Probs(p) = &param {
            check_constant(&config, PROBS, p, Constraint::UnitInterval)?;
        }
        Ok(Self {
            temperature,
            param,
            config,
            dtype: DType::F64,
            name: Family::RelaxedBernoulli.name().to_string(),
        })
    }

    /// Permissive instance parameterized by `probs`.
    pub fn from_probs(temperature: impl Into<Param>, probs: impl Into<Param>) -> Result<Self> {
        Self::new(temperature, Some(probs.into()), None, DistributionConfig::default())
    }

    /// Permissive instance parameterized by `logits`.
    pub fn from_logits(temperature: impl Into<Param>, logits: impl Into<Param>) -> Result<Self> {
        Self::new(temperature, None, Some(logits.into()), DistributionConfig::default())
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

    /// Temperature parameter.
    pub fn temperature(&self) -> &Param {
        &self.temperature
    }

    /// The stored Bernoulli parameter.
    pub fn param(&self) -> &ProbsOrLogits {
        &self.param
    }

    fn temperature_value(&self) -> Result<ArrayD<f64>> {
        read_param(&self.config, TEMPERATURE, &self.temperature, Constraint::Positive)
    }

    /// Current probabilities, converted from logits when needed.
    pub fn probs_parameter(&self) -> Result<ArrayD<f64>> {
        match &self.param {
            ProbsOrLogits::Probs(p) => read_param(&self.config, PROBS, p, Constraint::UnitInterval),
            ProbsOrLogits::Logits(l) => Ok(l.value().mapv(sigmoid)),
        }
    }

    /// Current logits, converted from probabilities when needed.
    pub fn logits_parameter(&self) -> Result<ArrayD<f64>> {
        match &self.param {
            ProbsOrLogits::Probs(p) => {
                Ok(read_param(&self.config, PROBS, p, Constraint::UnitInterval)?.mapv(logit))
            }
            ProbsOrLogits::Logits(l) => Ok(l.value()),
        }
    }

    fn check_sample(&self, x: &ArrayD<f64>) -> Result<()> {
        guard_sample(&self.config, x.iter().any(|&v| v < 0.0), "Sample must be non-negative.")?;
        guard_sample(
            &self.config,
            x.iter().any(|&v| v > 1.0),
            "Sample must be less than or equal to `1`.",
        )
    }
}

fn log_prob_scalar(t: f64, l: f64, x: f64) -> f64 {
    if x.is_nan() || t.is_nan() || l.is_nan() {
        return f64::NAN;
    }
    if !(0.0..=1.0).contains(&x) {
        return f64::NEG_INFINITY;
    }
    // Infinite logits are point masses at the matching endpoint.
    if l == f64::INFINITY {
        return if x == 1.0 { f64::INFINITY } else { f64::NEG_INFINITY };
    }
    if l == f64::NEG_INFINITY {
        return if x == 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
    }
    if x == 0.0 {
        return t.ln() - l + xlogy(t - 1.0, 0.0);
    }
    if x == 1.0 {
        return t.ln() + l + xlogy(t - 1.0, 0.0);
    }
    let z = t * logit(x) - l;
    t.ln() + log_sigmoid(z) + log_sigmoid(-z) - x.ln() - (-x).ln_1p()
}

fn log_cdf_scalar(t: f64, l: f64, x: f64) -> f64 {
    if x.is_nan() || t.is_nan() || l.is_nan() {
        return f64::NAN;
    }
    if x >= 1.0 {
        return 0.0;
    }
    if x < 0.0 || l == f64::INFINITY {
        return f64::NEG_INFINITY;
    }
    if l == f64::NEG_INFINITY {
        return 0.0;
    }
    log_sigmoid(t * logit(x) - l)
}

impl Distribution for RelaxedBernoulli {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> Family {
        Family::RelaxedBernoulli
    }

    fn config(&self) -> &DistributionConfig {
        &self.config
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn batch_shape(&self) -> Result<Vec<usize>> {
        let p = match &self.param {
            ProbsOrLogits::Probs(p) | ProbsOrLogits::Logits(p) => p.shape(),
        };
        broadcast_shapes(&self.temperature.shape(), &p)
    }

    fn event_shape(&self) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }

    fn parameter_properties(&self) -> Vec<ParameterProperties> {
        let second = match &self.param {
            ProbsOrLogits::Probs(_) => {
                ParameterProperties { name: PROBS, constraint: Constraint::UnitInterval, event_ndims: 0 }
            }
            ProbsOrLogits::Logits(_) => {
                ParameterProperties { name: LOGITS, constraint: Constraint::Real, event_ndims: 0 }
            }
        };
        vec![
            ParameterProperties { name: TEMPERATURE, constraint: Constraint::Positive, event_ndims: 0 },
            second,
        ]
    }

    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let t = self.temperature_value()?;
        let l = self.logits_parameter()?;
        self.check_sample(x)?;
        map3(&t, &l, x, log_prob_scalar)
    }

    fn log_cdf(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let t = self.temperature_value()?;
        let l = self.logits_parameter()?;
        self.check_sample(x)?;
        map3(&t, &l, x, log_cdf_scalar)
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
        let t = self.temperature_value()?;
        let l = self.logits_parameter()?;
        let batch = broadcast_shapes(t.shape(), l.shape())?;
        let tb = broadcast_view(&t, &batch)?;
        let lb = broadcast_view(&l, &batch)?;

        let n = num_elements(sample_shape);
        let mut out = Vec::with_capacity(n * num_elements(&batch));
        for _ in 0..n {
            Zip::from(&tb).and(&lb).for_each(|&ti, &li| {
                let u: f64 = rng.sample(Open01);
                let logistic = u.ln() - (-u).ln_1p();
                out.push(self.dtype.cast(sigmoid((li + logistic) / ti)));
            });
        }
        let shape = concat_shapes(&[sample_shape, &batch]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn default_event_space_bijector(&self) -> Result<Box<dyn Bijector>> {
        Ok(Box::new(Elementwise::new(Sigmoid::unit())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
