//! WS-Federation error types.

use fb_protocol::RejectReason;
use fb_protocol_saml::SamlError;
use thiserror::Error;

use crate::sts::TransportError;

/// Result type for WS-Federation operations.
pub type WsFedResult<T> = Result<T, WsFedError>;

/// WS-Federation protocol errors.
#[derive(Debug, Error)]
pub enum WsFedError {
    /// A required `w*` parameter is absent or unusable.
    #[error("invalid parameter {0}")]
    Parameter(String),

    /// The token response could not be parsed.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The contained SAML token is not valid.
    #[error(transparent)]
    Saml(#[from] SamlError),

    /// The token service could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WsFedError {
    /// Returns the rejection reason for a response that failed with this error.
    #[must_use]
    pub const fn reject_reason(&self) -> RejectReason {
        match self {
            Self::Transport(_) => RejectReason::Expired,
            Self::Parameter(_) | Self::InvalidResponse(_) | Self::Saml(_) => RejectReason::Malformed,
        }
    }
}

impl From<quick_xml::Error> for WsFedError {
    fn from(err: quick_xml::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
