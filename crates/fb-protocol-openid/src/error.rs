//! OpenID error types.

use fb_protocol::{ProtocolError, RejectReason};
use thiserror::Error;

/// Result type for OpenID operations.
pub type OpenIdResult<T> = Result<T, OpenIdError>;

/// OpenID protocol errors.
#[derive(Debug, Error)]
pub enum OpenIdError {
    /// A required `openid.*` parameter is absent.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter value is not well formed.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Full parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The message is not an OpenID 2.0 message.
    #[error("unsupported namespace: {0}")]
    Namespace(String),

    /// The association secret is unusable.
    #[error("association error: {0}")]
    Association(String),

    /// The signature does not verify or does not cover the required fields.
    #[error("signature error: {0}")]
    Signature(String),
}

impl OpenIdError {
    /// Creates an [`OpenIdError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the rejection reason for a response that failed with this error.
    #[must_use]
    pub const fn reject_reason(&self) -> RejectReason {
        match self {
            Self::Signature(_) | Self::Association(_) => RejectReason::SignatureInvalid,
            Self::MissingParameter(_) | Self::InvalidParameter { .. } | Self::Namespace(_) => {
                RejectReason::Malformed
            }
        }
    }
}

impl From<OpenIdError> for ProtocolError {
    fn from(err: OpenIdError) -> Self {
        match err {
            OpenIdError::Association(msg) => Self::Configuration(msg),
            other => Self::Encoding(other.to_string()),
        }
    }
}
