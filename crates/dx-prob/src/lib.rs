//! Probability distributions for dx.
//!
//! This crate hosts:
//! - the [`Distribution`] trait and five families (Chi-squared, RelaxedBernoulli,
//!   Zipf, von Mises-Fisher, spherical uniform)
//! - bijectors (support maps and constrained parameterizations)
//! - the KL divergence registry
//! - small numeric helpers (stable log/exp/sigmoid primitives, zeta and Bessel functions)

pub mod bijectors;
pub mod chi2;
pub mod distribution;
pub mod kl;
pub mod math;
pub mod relaxed_bernoulli;
pub mod special;
pub mod spherical_uniform;
pub mod von_mises_fisher;
pub mod zipf;

pub use bijectors::{Bijector, ParameterTransform, ScalarBijector};
pub use chi2::Chi2;
pub use distribution::{Distribution, Family, ParameterProperties};
pub use kl::{KlFn, KlRegistry, kl_divergence, register_kl};
pub use relaxed_bernoulli::RelaxedBernoulli;
pub use spherical_uniform::SphericalUniform;
pub use von_mises_fisher::VonMisesFisher;
pub use zipf::Zipf;
