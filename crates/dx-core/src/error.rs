//! Error types for dx

use thiserror::Error;

/// dx error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A parameter or sample violates its domain constraint.
    ///
    /// Raised only when `validate_args` is enabled; the message uses the fixed
    /// vocabulary produced by [`crate::constraint`].
    #[error("Validation error: {0}")]
    Validation(String),

    /// Incompatible shapes (broadcasting, event size). Always checked.
    #[error("Shape error: {0}")]
    Shape(String),

    /// A statistic is undefined for the current parameters and
    /// `allow_nan_stats` is disabled.
    #[error("Undefined statistic: {0}")]
    Undefined(String),

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Shape(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
