//! Domain error model.

use thiserror::Error;

/// Result type used across the pure layer.
pub type MapResult<T> = Result<T, MapError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures a caller can fix (bad
/// parameters, unknown ids). Database concerns belong to the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A parameter failed validation (missing, malformed, out of range).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced row does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl MapError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
