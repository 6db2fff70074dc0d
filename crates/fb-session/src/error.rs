//! Correlation store error types.

use thiserror::Error;

/// Errors that can occur during correlation store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// State could not be serialized or deserialized.
    #[error("Correlation state serialization error: {0}")]
    Serialization(String),

    /// The backing store rejected the operation.
    #[error("Correlation storage error: {0}")]
    Storage(String),

    /// The backing store could not be reached.
    #[error("Correlation store unavailable: {0}")]
    Unavailable(String),

    /// The in-process store reached its capacity.
    #[error("Correlation store full ({0} entries)")]
    CapacityExceeded(usize),
}

impl SessionError {
    /// Checks if the failure is a connectivity problem.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for correlation store operations.
pub type SessionResult<T> = Result<T, SessionError>;
