//! Broker error types.

use fb_core::ErrorCategory;
use fb_protocol::ProtocolError;
use fb_session::SessionError;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors raised by configuration loading and exchange initiation.
///
/// Completion never fails with an error; it reports an [`crate::Outcome`].
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The configuration is missing, unreadable or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No adapter is registered for the requested protocol.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// The caller passed an unusable argument.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The adapter could not build the request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The correlation state could not be stored.
    #[error("correlation store error: {0}")]
    Session(#[from] SessionError),
}

impl BrokerError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::UnknownProtocol(_) => ErrorCategory::Configuration,
            Self::InvalidRequest(_) => ErrorCategory::ProtocolViolation,
            Self::Protocol(e) => e.category(),
            Self::Session(_) => ErrorCategory::Transport,
        }
    }
}

impl From<fb_core::Error> for BrokerError {
    fn from(err: fb_core::Error) -> Self {
        match err {
            fb_core::Error::Configuration(detail) => Self::Configuration(detail),
            other => Self::Configuration(other.to_string()),
        }
    }
}
