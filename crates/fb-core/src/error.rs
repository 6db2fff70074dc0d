//! Error taxonomy for the federation broker.
//!
//! ## NIST 800-53 Rev5: SI-11 (Error Handling)
//!
//! Failures are classified so that callers can decide what to log and what
//! to show. Nothing in a user-facing message echoes protocol detail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the broker error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or inconsistent configuration. Fatal at startup.
    Configuration,
    /// The response could not be bound to the request that produced it.
    Correlation,
    /// Malformed or tampered protocol message. Security relevant.
    ProtocolViolation,
    /// An external service could not be reached.
    Transport,
}

impl ErrorCategory {
    /// Returns whether failures of this class must be logged at warning level.
    #[must_use]
    pub const fn is_security_relevant(self) -> bool {
        matches!(self, Self::ProtocolViolation)
    }

    /// Returns the stable name of this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Correlation => "correlation",
            Self::ProtocolViolation => "protocol_violation",
            Self::Transport => "transport",
        }
    }
}

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Correlation failure.
    ///
    /// ## NIST 800-53 Rev5: IA-6 (Authentication Feedback)
    ///
    /// Uses a generic message; the detail is kept for logs only.
    #[error("authentication failed")]
    Correlation(String),

    /// Protocol violation.
    #[error("authentication failed")]
    ProtocolViolation(String),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Correlation(_) => ErrorCategory::Correlation,
            Self::ProtocolViolation(_) => ErrorCategory::ProtocolViolation,
            Self::Transport(_) | Self::Storage(_) | Self::Internal => ErrorCategory::Transport,
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal | Self::Transport(_))
    }

    /// Returns the internal detail, for logging.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Configuration(d)
            | Self::Correlation(d)
            | Self::ProtocolViolation(d)
            | Self::Transport(d)
            | Self::Storage(d) => Some(d.as_str()),
            Self::Internal => None,
        }
    }
}
