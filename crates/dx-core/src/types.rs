//! Sample dtypes.
//!
//! Samples are always carried as `f64` arrays; the dtype controls how drawn
//! values are quantized before they are handed back to the caller.

use serde::{Deserialize, Serialize};

/// Element type of the samples a distribution produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    #[default]
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
}

impl DType {
    /// `true` for the integer dtypes.
    pub fn is_integer(self) -> bool {
        matches!(self, DType::I32 | DType::I64)
    }

    /// Largest finite value representable by this dtype, as an `f64`.
    ///
    /// For `I64` this is `2^53`, the largest integer `f64` represents exactly.
    pub fn max_value(self) -> f64 {
        match self {
            DType::F32 => f32::MAX as f64,
            DType::F64 => f64::MAX,
            DType::I32 => i32::MAX as f64,
            DType::I64 => 9_007_199_254_740_992.0,
        }
    }

    /// Smallest finite value representable by this dtype, as an `f64`.
    pub fn min_value(self) -> f64 {
        match self {
            DType::F32 => f32::MIN as f64,
            DType::F64 => f64::MIN,
            DType::I32 => i32::MIN as f64,
            DType::I64 => -9_007_199_254_740_992.0,
        }
    }

    /// Quantize `v` to this dtype.
    ///
    /// Integer dtypes truncate toward zero and saturate at the dtype range.
    /// NaN is preserved for every dtype so invalid parameters stay visible.
    #[inline]
    pub fn cast(self, v: f64) -> f64 {
        match self {
            DType::F64 => v,
            DType::F32 => v as f32 as f64,
            DType::I32 | DType::I64 => {
                if v.is_nan() {
                    v
                } else {
                    v.trunc().clamp(self.min_value(), self.max_value())
                }
            }
        }
    }

    /// Short lowercase name (`"f32"`, `"i64"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_cast_truncates_and_saturates() {
        assert_eq!(DType::I32.cast(3.9), 3.0);
        assert_eq!(DType::I32.cast(-3.9), -3.0);
        assert_eq!(DType::I32.cast(1e12), i32::MAX as f64);
        assert_eq!(DType::I64.cast(f64::INFINITY), DType::I64.max_value());
        assert!(DType::I64.cast(f64::NAN).is_nan());
    }

    #[test]
    fn test_float_cast() {
        let v = 0.1f64;
        assert_eq!(DType::F64.cast(v), v);
        assert_eq!(DType::F32.cast(v), 0.1f32 as f64);
    }

    #[test]
    fn test_serde_names() {
        let s = serde_json::to_string(&DType::I32).unwrap();
        assert_eq!(s, "\"i32\"");
        let d: DType = serde_json::from_str("\"f32\"").unwrap();
        assert_eq!(d, DType::F32);
    }
}
