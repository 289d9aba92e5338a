//! KL divergence registry.
//!
//! Closed-form `KL(a || b)` implementations are looked up by the pair of
//! distribution families. The process-wide registry is created on first use
//! with the built-in pairs and can be extended at runtime.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::{debug, warn};
use ndarray::ArrayD;
use parking_lot::RwLock;

use dx_core::{Error, Result};

use crate::chi2::Chi2;
use crate::distribution::{Distribution, Family};
use crate::spherical_uniform::SphericalUniform;
use crate::von_mises_fisher::VonMisesFisher;

/// `KL(a || b)`, broadcast over both batches.
pub type KlFn = fn(&dyn Distribution, &dyn Distribution) -> Result<ArrayD<f64>>;

/// Map from `(family of a, family of b)` to a KL implementation.
#[derive(Debug, Clone, Default)]
pub struct KlRegistry {
    entries: HashMap<(Family, Family), KlFn>,
}

impl KlRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in pair.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register(Family::Chi2, Family::Chi2, kl_chi2_chi2);
        r.register(Family::VonMisesFisher, Family::VonMisesFisher, kl_vmf_vmf);
        r.register(Family::VonMisesFisher, Family::SphericalUniform, kl_vmf_uniform);
        r.register(Family::SphericalUniform, Family::SphericalUniform, kl_uniform_uniform);
        r
    }

    /// Register `f` for `(a, b)`, replacing (with a warning) any previous entry.
    pub fn register(&mut self, a: Family, b: Family, f: KlFn) {
        if self.entries.insert((a, b), f).is_some() {
            warn!("KL registry: replacing implementation for ({a}, {b})");
        }
    }

    /// Implementation registered for `(a, b)`, if any.
    pub fn get(&self, a: Family, b: Family) -> Option<KlFn> {
        self.entries.get(&(a, b)).copied()
    }

    /// Whether `(a, b)` has an implementation.
    pub fn contains(&self, a: Family, b: Family) -> bool {
        self.entries.contains_key(&(a, b))
    }

    /// Number of registered pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `KL(a || b)` through this registry.
    pub fn divergence(&self, a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
        let (fa, fb) = (a.family(), b.family());
        let f = self.get(fa, fb).ok_or_else(|| {
            Error::NotImplemented(format!("no KL divergence registered for ({fa}, {fb})"))
        })?;
        debug!("KL({}, {})", a.name(), b.name());
        f(a, b)
    }
}

static DEFAULT_REGISTRY: OnceLock<RwLock<KlRegistry>> = OnceLock::new();

/// Process-wide registry, populated with the built-ins on first access.
pub fn default_registry() -> &'static RwLock<KlRegistry> {
    DEFAULT_REGISTRY.get_or_init(|| RwLock::new(KlRegistry::with_builtins()))
}

/// Register `f` for `(a, b)` in the process-wide registry.
pub fn register_kl(a: Family, b: Family, f: KlFn) {
    default_registry().write().register(a, b, f);
}

/// `KL(a || b)` via the process-wide registry.
///
/// Fails with [`Error::NotImplemented`] for unregistered family pairs.
pub fn kl_divergence(a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
    // The lock is released before `f` runs; `f` may use the registry itself.
    let (fa, fb) = (a.family(), b.family());
    let f = default_registry().read().get(fa, fb);
    match f {
        Some(f) => f(a, b),
        None => Err(Error::NotImplemented(format!(
            "no KL divergence registered for ({fa}, {fb})"
        ))),
    }
}

fn downcast<T: 'static>(d: &dyn Distribution) -> Result<&T> {
    d.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::NotImplemented(format!(
            "{} (family {}) is not a {}",
            d.name(),
            d.family(),
            std::any::type_name::<T>()
        ))
    })
}

fn kl_chi2_chi2(a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
    downcast::<Chi2>(a)?.kl_divergence_to(downcast::<Chi2>(b)?)
}

fn kl_vmf_vmf(a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
    downcast::<VonMisesFisher>(a)?.kl_divergence_to(downcast::<VonMisesFisher>(b)?)
}

fn kl_vmf_uniform(a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
    downcast::<VonMisesFisher>(a)?.kl_divergence_to_uniform(downcast::<SphericalUniform>(b)?)
}

fn kl_uniform_uniform(a: &dyn Distribution, b: &dyn Distribution) -> Result<ArrayD<f64>> {
    downcast::<SphericalUniform>(a)?.kl_divergence_to(downcast::<SphericalUniform>(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxed_bernoulli::RelaxedBernoulli;
    use crate::zipf::Zipf;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_builtins_registered() {
        let r = KlRegistry::with_builtins();
        assert_eq!(r.len(), 4);
        assert!(r.contains(Family::VonMisesFisher, Family::SphericalUniform));
        assert!(!r.contains(Family::SphericalUniform, Family::VonMisesFisher));
        assert!(KlRegistry::new().is_empty());
    }

    #[test]
    fn test_chi2_kl_through_registry() {
        let a = Chi2::new([1.0, 3.0, 7.0]).unwrap();
        let b = Chi2::new(4.0).unwrap();
        let kl = kl_divergence(&a, &b).unwrap();
        let direct = a.kl_divergence_to(&b).unwrap();
        assert_eq!(kl, direct);
        assert!(kl.iter().all(|&v| v > 0.0));
        let zero = kl_divergence(&a, &a).unwrap();
        assert!(zero.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unregistered_pair() {
        let z = Zipf::new(3.0).unwrap();
        let c = Chi2::new(3.0).unwrap();
        let err = kl_divergence(&z, &c).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
        assert!(err.to_string().contains("(Zipf, Chi2)"));
    }

    fn always_one(_: &dyn Distribution, _: &dyn Distribution) -> Result<ArrayD<f64>> {
        Ok(array![1.0].into_dyn())
    }

    #[test]
    fn test_custom_registry_override() {
        let mut r = KlRegistry::with_builtins();
        r.register(Family::Chi2, Family::Chi2, always_one);
        let a = Chi2::new(2.0).unwrap();
        assert_eq!(r.divergence(&a, &a).unwrap(), array![1.0].into_dyn());
        // The process-wide registry is untouched.
        assert!(kl_divergence(&a, &a).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_register_into_default() {
        register_kl(Family::RelaxedBernoulli, Family::RelaxedBernoulli, always_one);
        let d = RelaxedBernoulli::from_probs(0.5, 0.3).unwrap();
        let kl = kl_divergence(&d, &d).unwrap();
        assert_relative_eq!(kl[[0]], 1.0);
    }

    #[test]
    fn test_mismatched_implementation_reports_type() {
        let mut r = KlRegistry::new();
        r.register(Family::Zipf, Family::Zipf, kl_chi2_chi2);
        let z = Zipf::new(3.0).unwrap();
        assert!(matches!(r.divergence(&z, &z), Err(Error::NotImplemented(_))));
    }
}
