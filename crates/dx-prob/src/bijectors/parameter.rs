//! Unconstrained reparameterization of distribution parameters.

use ndarray::ArrayD;

use dx_core::{Constraint, Error, Result};

use super::scalar::{Elementwise, PositiveBijectorKind, for_constraint};
use super::{Bijector, Stereographic};
use crate::distribution::{Distribution, ParameterProperties};

/// Options for building a [`ParameterTransform`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterTransformOptions {
    /// Map used for half-bounded domains (`Positive`, `NonNegative`, `GreaterThan`).
    pub positive_bijector: PositiveBijectorKind,
}

#[derive(Debug)]
struct Slot {
    name: &'static str,
    bijector: Box<dyn Bijector>,
}

/// Moves every parameter of a distribution between its domain and an
/// unconstrained space.
///
/// Values are passed as one array per parameter, in
/// [`Distribution::parameter_properties`] order. Scalar-constrained
/// parameters map elementwise. Unit-vector parameters use stereographic
/// projection, so their unconstrained form is one entry shorter along the
/// last axis.
#[derive(Debug)]
pub struct ParameterTransform {
    slots: Vec<Slot>,
}

impl ParameterTransform {
    /// One transform per parameter description.
    pub fn from_properties(props: &[ParameterProperties], opts: ParameterTransformOptions) -> Result<Self> {
        let slots = props.iter().map(|p| slot(p, opts)).collect::<Result<Vec<_>>>()?;
        Ok(Self { slots })
    }

    /// Transform for the parameters `dist` declares.
    pub fn for_distribution(dist: &dyn Distribution, opts: ParameterTransformOptions) -> Result<Self> {
        Self::from_properties(&dist.parameter_properties(), opts)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Parameter names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.name).collect()
    }

    /// Bijector used for each parameter.
    pub fn kinds(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.bijector.name()).collect()
    }

    /// Unconstrained values to parameter values.
    pub fn forward(&self, z: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
        self.check_count(z.len())?;
        self.slots.iter().zip(z).map(|(s, v)| s.bijector.forward(v)).collect()
    }

    /// Parameter values to unconstrained values. Values outside a
    /// parameter's domain map to NaN.
    pub fn inverse(&self, theta: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
        self.check_count(theta.len())?;
        self.slots.iter().zip(theta).map(|(s, v)| s.bijector.inverse(v)).collect()
    }

    /// `log|det J|` of [`Self::forward`] at `z`, summed over every element
    /// of every parameter.
    pub fn forward_log_det_jacobian(&self, z: &[ArrayD<f64>]) -> Result<f64> {
        self.check_count(z.len())?;
        let mut total = 0.0;
        for (s, v) in self.slots.iter().zip(z) {
            total += s.bijector.forward_log_det_jacobian(v, v.ndim())?.sum();
        }
        Ok(total)
    }

    fn check_count(&self, n: usize) -> Result<()> {
        if n != self.slots.len() {
            return Err(Error::Shape(format!(
                "expected {} parameter arrays ({}), got {}",
                self.slots.len(),
                self.names().join(", "),
                n
            )));
        }
        Ok(())
    }
}

fn slot(p: &ParameterProperties, opts: ParameterTransformOptions) -> Result<Slot> {
    let bijector: Box<dyn Bijector> = match (p.constraint, p.event_ndims) {
        (Constraint::UnitVector, 1) => Box::new(Stereographic::new()),
        (c, 0) => match for_constraint(c, opts.positive_bijector) {
            Some(b) => Box::new(Elementwise::new(b)),
            None => return Err(unsupported(p)),
        },
        _ => return Err(unsupported(p)),
    };
    Ok(Slot { name: p.name, bijector })
}

fn unsupported(p: &ParameterProperties) -> Error {
    Error::NotImplemented(format!(
        "no unconstrained transform for parameter `{}` ({:?} with event_ndims {})",
        p.name, p.constraint, p.event_ndims
    ))
}
