//! JSON input format for the `dx` CLI.
//!
//! A distribution is described by its family tag plus parameters given as
//! (possibly nested) JSON arrays, e.g.
//!
//! ```json
//! {"family": "von_mises_fisher", "mean_direction": [[0.6, 0.8]], "concentration": [1.0, 5.0],
//!  "config": {"validate_args": true}}
//! ```
//!
//! Non-finite numbers are written as the strings `"inf"`, `"-inf"` and `"nan"`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dx_core::{DType, DistributionConfig, Param};
use dx_prob::{Chi2, Distribution, Family, RelaxedBernoulli, SphericalUniform, VonMisesFisher, Zipf};

/// A scalar or a nested, rectangular list of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NdValue {
    Number(f64),
    Text(String),
    List(Vec<NdValue>),
}

impl NdValue {
    /// Convert to an array, inferring the shape from the nesting.
    pub fn to_array(&self) -> Result<ArrayD<f64>> {
        let mut shape = Vec::new();
        let mut cursor = self;
        while let NdValue::List(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }
        let mut data = Vec::new();
        self.flatten(&shape, &mut data)?;
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }

    fn flatten(&self, shape: &[usize], out: &mut Vec<f64>) -> Result<()> {
        match (self, shape.split_first()) {
            (NdValue::List(items), Some((&n, rest))) if items.len() == n => {
                for item in items {
                    item.flatten(rest, out)?;
                }
                Ok(())
            }
            (NdValue::Number(v), None) => {
                out.push(*v);
                Ok(())
            }
            (NdValue::Text(s), None) => {
                let v: f64 = s.trim().parse().with_context(|| format!("not a number: {s:?}"))?;
                out.push(v);
                Ok(())
            }
            _ => bail!("array is ragged or mixes nesting depths"),
        }
    }

    /// Parse a JSON literal such as `"[0.5, 1.0]"` or `"2"`.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).with_context(|| format!("invalid array literal: {text}"))
    }
}

/// JSON encoding of an array as nested lists.
pub fn array_to_json(a: &ArrayD<f64>) -> Value {
    view_to_json(a.view())
}

fn view_to_json(a: ArrayViewD<'_, f64>) -> Value {
    if a.ndim() == 0 {
        return a.first().map_or(Value::Null, |&v| number_to_json(v));
    }
    Value::Array(a.axis_iter(Axis(0)).map(view_to_json).collect())
}

fn number_to_json(v: f64) -> Value {
    if v.is_nan() {
        Value::from("nan")
    } else if v == f64::INFINITY {
        Value::from("inf")
    } else if v == f64::NEG_INFINITY {
        Value::from("-inf")
    } else {
        Value::from(v)
    }
}

/// One distribution, tagged by family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DistributionSpec {
    Chi2 {
        df: NdValue,
        #[serde(default)]
        config: DistributionConfig,
        #[serde(default)]
        dtype: Option<DType>,
    },
    RelaxedBernoulli {
        temperature: NdValue,
        #[serde(default)]
        probs: Option<NdValue>,
        #[serde(default)]
        logits: Option<NdValue>,
        #[serde(default)]
        config: DistributionConfig,
        #[serde(default)]
        dtype: Option<DType>,
    },
    Zipf {
        power: NdValue,
        #[serde(default)]
        config: DistributionConfig,
        #[serde(default)]
        dtype: Option<DType>,
    },
    VonMisesFisher {
        mean_direction: NdValue,
        concentration: NdValue,
        #[serde(default)]
        config: DistributionConfig,
        #[serde(default)]
        dtype: Option<DType>,
    },
    SphericalUniform {
        dimension: usize,
        #[serde(default)]
        batch_shape: Vec<usize>,
        #[serde(default)]
        config: DistributionConfig,
        #[serde(default)]
        dtype: Option<DType>,
    },
}

impl DistributionSpec {
    /// Read and parse a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let spec: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse distribution in {}", path.display()))?;
        tracing::info!(path = %path.display(), family = %spec.family(), "loaded distribution");
        Ok(spec)
    }

    /// Family tag.
    pub fn family(&self) -> Family {
        match self {
            DistributionSpec::Chi2 { .. } => Family::Chi2,
            DistributionSpec::RelaxedBernoulli { .. } => Family::RelaxedBernoulli,
            DistributionSpec::Zipf { .. } => Family::Zipf,
            DistributionSpec::VonMisesFisher { .. } => Family::VonMisesFisher,
            DistributionSpec::SphericalUniform { .. } => Family::SphericalUniform,
        }
    }

    /// Construct the distribution.
    pub fn build(&self) -> Result<Box<dyn Distribution>> {
        let d: Box<dyn Distribution> = match self {
            DistributionSpec::Chi2 { df, config, dtype } => {
                let d = Chi2::with_config(df.to_array()?, *config)?;
                Box::new(with_dtype(d, *dtype, Chi2::with_dtype))
            }
            DistributionSpec::RelaxedBernoulli { temperature, probs, logits, config, dtype } => {
                let probs = probs.as_ref().map(|p| p.to_array().map(Param::from)).transpose()?;
                let logits = logits.as_ref().map(|l| l.to_array().map(Param::from)).transpose()?;
                let d = RelaxedBernoulli::new(temperature.to_array()?, probs, logits, *config)?;
                Box::new(with_dtype(d, *dtype, RelaxedBernoulli::with_dtype))
            }
            DistributionSpec::Zipf { power, config, dtype } => {
                let d = Zipf::with_config(power.to_array()?, *config)?;
                Box::new(with_dtype(d, *dtype, Zipf::with_dtype))
            }
            DistributionSpec::VonMisesFisher { mean_direction, concentration, config, dtype } => {
                let d = VonMisesFisher::with_config(
                    mean_direction.to_array()?,
                    concentration.to_array()?,
                    *config,
                )?;
                Box::new(with_dtype(d, *dtype, VonMisesFisher::with_dtype))
            }
            DistributionSpec::SphericalUniform { dimension, batch_shape, config, dtype } => {
                let d = SphericalUniform::with_config(*dimension, batch_shape.clone(), *config)?;
                Box::new(with_dtype(d, *dtype, SphericalUniform::with_dtype))
            }
        };
        let (batch, event) = (d.batch_shape()?, d.event_shape()?);
        tracing::debug!(name = d.name(), batch_shape = ?batch, event_shape = ?event, "built distribution");
        Ok(d)
    }
}

fn with_dtype<D>(d: D, dtype: Option<DType>, set: fn(D, DType) -> D) -> D {
    match dtype {
        Some(dtype) => set(d, dtype),
        None => d,
    }
}
