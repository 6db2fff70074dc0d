//! SAML error types.
//!
//! Errors raised while decoding and parsing SAML messages. The adapter turns
//! each of them into a [`RejectReason`] before anything leaves the crate.

use fb_protocol::{ProtocolError, RejectReason};
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// Failures while building an AuthnRequest or reading a Response.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The outbound AuthnRequest could not be built.
    #[error("cannot build AuthnRequest: {0}")]
    InvalidRequest(String),

    /// The Response is structurally wrong (bad root, no status, ...).
    #[error("unusable SAML response: {0}")]
    InvalidResponse(String),

    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    XmlParse(String),

    /// A required element or attribute is absent.
    #[error("{0} is missing")]
    MissingElement(String),

    /// An `xs:dateTime` value could not be parsed.
    #[error("bad dateTime value: {0}")]
    InvalidTimestamp(String),

    /// A message parameter is not valid base64.
    #[error("message parameter is not base64: {0}")]
    Base64Decode(String),

    /// Redirect binding DEFLATE step failed.
    #[error("redirect binding deflate failed: {0}")]
    Deflate(String),

    /// The request signer refused to sign.
    #[error("request signing failed: {0}")]
    SignatureCreation(String),
}

impl SamlError {
    /// Returns the rejection reason for a response that failed with this error.
    #[must_use]
    pub const fn reject_reason(&self) -> RejectReason {
        match self {
            Self::SignatureCreation(_) => RejectReason::SignatureInvalid,
            _ => RejectReason::Malformed,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<SamlError> for ProtocolError {
    fn from(err: SamlError) -> Self {
        match err {
            SamlError::SignatureCreation(msg) => Self::Signing(fb_protocol::SigningError(msg)),
            other => Self::Encoding(other.to_string()),
        }
    }
}
