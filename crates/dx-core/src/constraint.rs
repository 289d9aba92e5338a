//! Parameter domain constraints and their validation messages.
//!
//! Messages follow a fixed vocabulary (``Argument `df` must be positive.``)
//! so callers and tests can match on substrings.

use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tolerance used when checking that a vector has unit norm.
pub const UNIT_NORM_TOL: f64 = 1e-5;

/// Domain of a distribution parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Any real value.
    Real,
    /// `(0, inf)`.
    Positive,
    /// `[0, inf)`.
    NonNegative,
    /// `(bound, inf)`.
    GreaterThan {
        /// Exclusive lower bound.
        bound: f64,
    },
    /// `[0, 1]`.
    UnitInterval,
    /// Rows along the last axis have unit L2 norm; the last axis has at least 2 entries.
    UnitVector,
}

impl Constraint {
    /// Check every element of `value`, naming the argument `name` on failure.
    ///
    /// NaN fails every ordered comparison and is therefore rejected by all
    /// constraints except [`Constraint::Real`].
    pub fn check(&self, name: &str, value: &ArrayD<f64>) -> Result<()> {
        match *self {
            Constraint::Real => Ok(()),
            Constraint::Positive => {
                if value.iter().all(|&v| v > 0.0) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!("Argument `{name}` must be positive.")))
                }
            }
            Constraint::NonNegative => {
                if value.iter().all(|&v| v >= 0.0) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!("Argument `{name}` must be non-negative.")))
                }
            }
            Constraint::GreaterThan { bound } => {
                if value.iter().all(|&v| v > bound) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!(
                        "Argument `{name}` must be greater than {}.",
                        fmt_bound(bound)
                    )))
                }
            }
            Constraint::UnitInterval => {
                if value.iter().any(|&v| v.is_nan() || v < 0.0) {
                    return Err(Error::Validation(format!(
                        "Argument `{name}` has components less than 0."
                    )));
                }
                if value.iter().any(|&v| v > 1.0) {
                    return Err(Error::Validation(format!(
                        "Argument `{name}` has components greater than 1."
                    )));
                }
                Ok(())
            }
            Constraint::UnitVector => {
                if value.ndim() == 0 || value.shape()[value.ndim() - 1] < 2 {
                    return Err(Error::Validation(format!(
                        "Argument `{name}` may not have scalar event shape."
                    )));
                }
                if all_unit_norm(value, UNIT_NORM_TOL) {
                    Ok(())
                } else {
                    Err(Error::Validation(format!("Argument `{name}` must be unit-length.")))
                }
            }
        }
    }
}

/// `true` when every row along the last axis has L2 norm within `tol` of 1.
pub fn all_unit_norm(value: &ArrayD<f64>, tol: f64) -> bool {
    if value.ndim() == 0 {
        return false;
    }
    let last = Axis(value.ndim() - 1);
    value.lanes(last).into_iter().all(|row| {
        let n2: f64 = row.iter().map(|v| v * v).sum();
        (n2.sqrt() - 1.0).abs() <= tol
    })
}

fn fmt_bound(b: f64) -> String {
    if b.fract() == 0.0 && b.abs() < 1e15 { format!("{}", b as i64) } else { format!("{b}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn msg(r: Result<()>) -> String {
        r.unwrap_err().to_string()
    }

    #[test]
    fn test_positive_messages() {
        let ok = array![0.5, 3.0].into_dyn();
        assert!(Constraint::Positive.check("df", &ok).is_ok());
        let bad = array![1.0, 0.0].into_dyn();
        assert!(msg(Constraint::Positive.check("df", &bad)).contains("Argument `df` must be positive."));
        let nan = array![f64::NAN].into_dyn();
        assert!(Constraint::Positive.check("df", &nan).is_err());
    }

    #[test]
    fn test_greater_than_formats_integral_bound() {
        let bad = array![1.0].into_dyn();
        let m = msg(Constraint::GreaterThan { bound: 1.0 }.check("power", &bad));
        assert!(m.contains("Argument `power` must be greater than 1."), "{m}");
    }

    #[test]
    fn test_unit_interval_messages() {
        let hi = array![0.2, 1.5].into_dyn();
        assert!(msg(Constraint::UnitInterval.check("probs", &hi)).contains("greater than 1."));
        let lo = array![-0.1].into_dyn();
        assert!(msg(Constraint::UnitInterval.check("probs", &lo)).contains("less than 0."));
        let edge = array![0.0, 1.0].into_dyn();
        assert!(Constraint::UnitInterval.check("probs", &edge).is_ok());
    }

    #[test]
    fn test_unit_vector() {
        let ok = array![[1.0, 0.0], [0.6, 0.8]].into_dyn();
        assert!(Constraint::UnitVector.check("mean_direction", &ok).is_ok());
        let not_unit = array![[1.0, 1.0]].into_dyn();
        assert!(msg(Constraint::UnitVector.check("mean_direction", &not_unit))
            .contains("must be unit-length."));
        let scalar_event = array![[1.0], [1.0]].into_dyn();
        assert!(msg(Constraint::UnitVector.check("mean_direction", &scalar_event))
            .contains("may not have scalar event shape."));
    }
}
