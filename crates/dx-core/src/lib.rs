//! Core types for the dx distribution engine.
//!
//! - [`Error`] / [`Result`]
//! - [`DType`] for sample quantization
//! - broadcasting helpers in [`shape`]
//! - [`Param`] / [`Variable`] parameter handles
//! - [`Constraint`] and [`DistributionConfig`]

pub mod config;
pub mod constraint;
pub mod error;
pub mod param;
pub mod shape;
pub mod types;

pub use config::DistributionConfig;
pub use constraint::Constraint;
pub use error::{Error, Result};
pub use param::{IntoArray, Param, Variable};
pub use types::DType;
