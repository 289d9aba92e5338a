//! The [`Distribution`] trait shared by every family.
//!
//! Every public operation reads the current parameter values once, validates
//! them when `validate_args` is set, and computes with that snapshot.
//! Batched outputs broadcast parameters against each other and against the
//! input, numpy style.

use std::any::Any;
use std::fmt;

use ndarray::ArrayD;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use dx_core::{Constraint, DType, DistributionConfig, Error, Param, Result};

use crate::bijectors::Bijector;

/// Distribution family tag, used as the key of the KL registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Chi-squared.
    Chi2,
    /// Relaxed (concrete / Gumbel-softmax) Bernoulli.
    RelaxedBernoulli,
    /// Zipf (zeta).
    Zipf,
    /// von Mises-Fisher on the unit sphere.
    VonMisesFisher,
    /// Uniform on the unit sphere.
    SphericalUniform,
}

impl Family {
    /// CamelCase display name.
    pub fn name(self) -> &'static str {
        match self {
            Family::Chi2 => "Chi2",
            Family::RelaxedBernoulli => "RelaxedBernoulli",
            Family::Zipf => "Zipf",
            Family::VonMisesFisher => "VonMisesFisher",
            Family::SphericalUniform => "SphericalUniform",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of one distribution parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterProperties {
    /// Argument name as used in validation messages.
    pub name: &'static str,
    /// Domain of the parameter.
    pub constraint: Constraint,
    /// Number of trailing dimensions belonging to one parameter value.
    pub event_ndims: usize,
}

/// A batch of probability distributions sharing a family.
///
/// Shapes follow `sample_shape + batch_shape + event_shape`. Defaults:
/// `prob` and `cdf` exponentiate their log counterparts, `stddev` is the
/// square root of `variance`, and everything without a closed form returns
/// [`Error::NotImplemented`].
pub trait Distribution: Send + Sync + fmt::Debug {
    /// Instance name (defaults to the family name).
    fn name(&self) -> &str;

    /// Family tag.
    fn family(&self) -> Family;

    /// Validation / statistics policy.
    fn config(&self) -> &DistributionConfig;

    /// Sample dtype.
    fn dtype(&self) -> DType;

    /// Broadcast shape of the parameters, excluding event dimensions.
    fn batch_shape(&self) -> Result<Vec<usize>>;

    /// Shape of a single draw.
    fn event_shape(&self) -> Result<Vec<usize>>;

    /// Parameter names, domains and event ranks.
    fn parameter_properties(&self) -> Vec<ParameterProperties>;

    /// Log density (or mass) of `x`, broadcast against the batch.
    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>>;

    /// `exp(log_prob(x))`.
    fn prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Ok(self.log_prob(x)?.mapv(f64::exp))
    }

    /// Log of the cumulative distribution function.
    fn log_cdf(&self, _x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "log_cdf"))
    }

    /// `exp(log_cdf(x))`.
    fn cdf(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Ok(self.log_cdf(x)?.mapv(f64::exp))
    }

    /// Inverse CDF.
    fn quantile(&self, _p: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "quantile"))
    }

    /// Draw an array of shape `sample_shape + batch_shape + event_shape`.
    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>>;

    /// [`Self::sample`] with a fresh `StdRng` seeded from `seed`.
    ///
    /// Same seed and same parameters produce bit-identical output.
    fn sample_with_seed(&self, sample_shape: &[usize], seed: u64) -> Result<ArrayD<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(sample_shape, &mut rng)
    }

    /// Mean.
    fn mean(&self) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "mean"))
    }

    /// Variance (per component for vector events).
    fn variance(&self) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "variance"))
    }

    /// `sqrt(variance)`.
    fn stddev(&self) -> Result<ArrayD<f64>> {
        Ok(self.variance()?.mapv(f64::sqrt))
    }

    /// Mode.
    fn mode(&self) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "mode"))
    }

    /// Differential (or Shannon) entropy in nats.
    fn entropy(&self) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "entropy"))
    }

    /// Covariance matrix of vector events, shape `batch_shape + [d, d]`.
    fn covariance(&self) -> Result<ArrayD<f64>> {
        Err(not_implemented(self.name(), "covariance"))
    }

    /// Bijector from unconstrained space onto the support.
    fn default_event_space_bijector(&self) -> Result<Box<dyn Bijector>> {
        Err(not_implemented(self.name(), "default_event_space_bijector"))
    }

    /// Downcasting hook for the KL registry.
    fn as_any(&self) -> &dyn Any;
}

pub(crate) fn not_implemented(name: &str, op: &str) -> Error {
    Error::NotImplemented(format!("`{op}` is not implemented for {name}"))
}

/// Snapshot `param` and validate it against `constraint` if required.
///
/// Constants are validated once at construction, so only variables are
/// re-checked here.
pub(crate) fn read_param(
    config: &DistributionConfig,
    name: &str,
    param: &Param,
    constraint: Constraint,
) -> Result<ArrayD<f64>> {
    let value = param.value();
    if config.validate_args && param.is_variable() {
        constraint.check(name, &value)?;
    }
    Ok(value)
}

/// Construction-time check of a constant parameter.
pub(crate) fn check_constant(
    config: &DistributionConfig,
    name: &str,
    param: &Param,
    constraint: Constraint,
) -> Result<()> {
    if config.validate_args {
        if let Param::Constant(value) = param {
            constraint.check(name, value)?;
        }
    }
    Ok(())
}

/// Fail with [`Error::Undefined`] when `undefined` holds and NaN stats are disallowed.
pub(crate) fn guard_undefined(
    config: &DistributionConfig,
    undefined: bool,
    what: impl FnOnce() -> String,
) -> Result<()> {
    if undefined && !config.allow_nan_stats {
        return Err(Error::Undefined(what()));
    }
    Ok(())
}

/// Fail with a sample-validation error when `violated` holds and `validate_args` is set.
pub(crate) fn guard_sample(config: &DistributionConfig, violated: bool, message: &str) -> Result<()> {
    if violated && config.validate_args {
        return Err(Error::Validation(message.to_string()));
    }
    Ok(())
}
