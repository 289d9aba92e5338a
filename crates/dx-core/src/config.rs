//! Behavior flags shared by every distribution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Validation and statistics policy of a distribution instance.
///
/// The default is permissive: nothing is validated, undefined statistics are
/// reported as NaN, and discrete families interpolate between integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Validate parameters (and samples passed to density functions).
    pub validate_args: bool,
    /// Return NaN for undefined statistics instead of [`crate::Error::Undefined`].
    pub allow_nan_stats: bool,
    /// Discrete families assign zero mass to non-integer inputs.
    pub force_probs_to_zero_outside_support: bool,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self { validate_args: false, allow_nan_stats: true, force_probs_to_zero_outside_support: false }
    }
}

impl DistributionConfig {
    /// Validate everything and refuse undefined statistics.
    pub fn strict() -> Self {
        Self { validate_args: true, allow_nan_stats: false, force_probs_to_zero_outside_support: false }
    }

    /// Set `validate_args`.
    pub fn with_validate_args(mut self, on: bool) -> Self {
        self.validate_args = on;
        self
    }

    /// Set `allow_nan_stats`.
    pub fn with_allow_nan_stats(mut self, on: bool) -> Self {
        self.allow_nan_stats = on;
        self
    }

    /// Set `force_probs_to_zero_outside_support`.
    pub fn with_force_probs_to_zero_outside_support(mut self, on: bool) -> Self {
        self.force_probs_to_zero_outside_support = on;
        self
    }

    /// Parse from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parse from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
