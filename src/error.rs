//! Error types for usage tracking and report generation.

use thiserror::Error;

/// Main error type for session and report operations.
///
/// Failures on the tracking path (origin resolution, breakpoint lookup) are
/// never surfaced as errors: reads through a tracked view must behave exactly
/// like reads on the plain state.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be serialized canonically (non-serializable value or
    /// nesting deeper than the deserializer accepts).
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid origin pattern: {0}")]
    InvalidPattern(String),

    #[error("Persistence unavailable")]
    PersistenceUnavailable,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("No state has been recorded yet")]
    NoState,
}

impl From<serde_json::Error> for UsageError {
    fn from(e: serde_json::Error) -> Self {
        UsageError::Serialization(e.to_string())
    }
}

impl From<regex::Error> for UsageError {
    fn from(e: regex::Error) -> Self {
        UsageError::InvalidPattern(e.to_string())
    }
}

/// Result type for usage operations.
pub type Result<T> = std::result::Result<T, UsageError>;
