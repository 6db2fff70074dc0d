//! Protocol adapter error types.
//!
//! Only request construction can fail with an error. Response validation
//! reports failure through [`crate::ValidationResult::Rejected`].

use fb_core::ErrorCategory;
use thiserror::Error;

use crate::crypto::SigningError;

/// Result type for adapter operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building an outbound request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Adapter configuration is missing or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be signed.
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The request could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::Signing(_) => ErrorCategory::Configuration,
            Self::Encoding(_) | Self::Internal(_) => ErrorCategory::Transport,
        }
    }
}
