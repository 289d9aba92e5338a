//! Uniform distribution on the unit sphere `S^{d-1}` in `R^d`.

use std::any::Any;

use ndarray::{ArrayD, IxDyn};
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use dx_core::constraint::{UNIT_NORM_TOL, all_unit_norm};
use dx_core::shape::{broadcast_shapes, concat_shapes, num_elements};
use dx_core::{DType, DistributionConfig, Error, Result};

use crate::bijectors::{Bijector, Stereographic};
use crate::distribution::{Distribution, Family, ParameterProperties, guard_sample};
use crate::special::log_sphere_area;
use crate::von_mises_fisher::check_innermost;

/// Uniform distribution over unit vectors of length `dimension`.
///
/// Has no parameters besides the (structural) dimension; the batch shape is
/// given explicitly.
#[derive(Debug, Clone)]
pub struct SphericalUniform {
    dimension: usize,
    batch_shape: Vec<usize>,
    config: DistributionConfig,
    dtype: DType,
    name: String,
}

impl SphericalUniform {
    /// Permissive `SphericalUniform(dimension)` with the given batch shape.
    pub fn new(dimension: usize, batch_shape: Vec<usize>) -> Result<Self> {
        Self::with_config(dimension, batch_shape, DistributionConfig::default())
    }

    /// Construct with explicit validation policy. `dimension` is always checked.
    pub fn with_config(dimension: usize, batch_shape: Vec<usize>, config: DistributionConfig) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Validation("Argument `dimension` must be positive.".into()));
        }
        Ok(Self {
            dimension,
            batch_shape,
            config,
            dtype: DType::F64,
            name: Family::SphericalUniform.name().to_string(),
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

    /// Length of each event vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Batch shape.
    pub fn batch(&self) -> &[usize] {
        &self.batch_shape
    }

    fn full_shape(&self, trailing: &[usize]) -> Vec<usize> {
        concat_shapes(&[&self.batch_shape, trailing])
    }

    /// `KL(self || other)`: zero on matching dimensions.
    pub fn kl_divergence_to(&self, other: &SphericalUniform) -> Result<ArrayD<f64>> {
        if self.dimension != other.dimension {
            return Err(Error::Shape(format!(
                "KL between spherical uniforms of dimensions {} and {}",
                self.dimension, other.dimension
            )));
        }
        let batch = broadcast_shapes(&self.batch_shape, &other.batch_shape)?;
        Ok(ArrayD::zeros(IxDyn(&batch)))
    }
}

impl Distribution for SphericalUniform {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> Family {
        Family::SphericalUniform
    }

    fn config(&self) -> &DistributionConfig {
        &self.config
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn batch_shape(&self) -> Result<Vec<usize>> {
        Ok(self.batch_shape.clone())
    }

    fn event_shape(&self) -> Result<Vec<usize>> {
        Ok(vec![self.dimension])
    }

    fn parameter_properties(&self) -> Vec<ParameterProperties> {
        Vec::new()
    }

    fn log_prob(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        check_innermost(x, self.dimension)?;
        guard_sample(&self.config, !all_unit_norm(x, UNIT_NORM_TOL), "Samples must be unit length.")?;
        let outer = &x.shape()[..x.ndim() - 1];
        let shape = broadcast_shapes(outer, &self.batch_shape)?;
        Ok(ArrayD::from_elem(IxDyn(&shape), -log_sphere_area(self.dimension as f64)))
    }

    fn sample(&self, sample_shape: &[usize], rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
        let d = self.dimension;
        let rows = num_elements(sample_shape) * num_elements(&self.batch_shape);
        let mut out = vec![0.0; rows * d];
        for row in out.chunks_mut(d) {
            let mut norm2: f64 = 0.0;
            while norm2 == 0.0 {
                for v in row.iter_mut() {
                    *v = rng.sample(StandardNormal);
                }
                norm2 = row.iter().map(|v| v * v).sum();
            }
            let norm = norm2.sqrt();
            row.iter_mut().for_each(|v| *v = self.dtype.cast(*v / norm));
        }
        let shape = concat_shapes(&[sample_shape, &self.batch_shape, &[d]]);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    fn mean(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::zeros(IxDyn(&self.full_shape(&[self.dimension]))))
    }

    fn covariance(&self) -> Result<ArrayD<f64>> {
        let d = self.dimension;
        let mut out = vec![0.0; num_elements(&self.batch_shape) * d * d];
        for block in out.chunks_mut(d * d) {
            for i in 0..d {
                block[i * d + i] = 1.0 / d as f64;
            }
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&self.full_shape(&[d, d])), out)?)
    }

    fn variance(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::from_elem(IxDyn(&self.full_shape(&[self.dimension])), 1.0 / self.dimension as f64))
    }

    fn entropy(&self) -> Result<ArrayD<f64>> {
        Ok(ArrayD::from_elem(IxDyn(&self.batch_shape), log_sphere_area(self.dimension as f64)))
    }

    fn default_event_space_bijector(&self) -> Result<Box<dyn Bijector>> {
        if self.dimension < 2 {
            return Err(Error::NotImplemented(format!(
                "no support bijector for a sphere in R^{}",
                self.dimension
            )));
        }
        Ok(Box::new(Stereographic::new()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
