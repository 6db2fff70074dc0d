//! The protocol adapter trait and its input/output types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use fb_core::{AttributeMap, DefaultAttribute, ErrorCategory, RawAttributes};
use fb_session::ExchangeState;
use serde::{Deserialize, Serialize};

use crate::descriptor::ProtocolDescriptor;
use crate::error::ProtocolResult;
use crate::instruction::OutboundInstruction;

/// Per-initiation input supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Opaque value round-tripped through the exchange.
    pub relay_state: Option<String>,
    /// Preferred user interface language (BCP 47).
    pub language: Option<String>,
    /// `scheme://host:port` of the request that started the exchange.
    pub origin: Option<String>,
    /// Overrides the configured identity provider endpoint.
    pub idp_destination: Option<String>,
}

impl TargetDescriptor {
    /// Creates an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Sets the preferred language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the request origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the identity provider endpoint.
    #[must_use]
    pub fn with_idp_destination(mut self, destination: impl Into<String>) -> Self {
        self.idp_destination = Some(destination.into());
        self
    }
}

/// Output of [`ProtocolAdapter::initiate`].
#[derive(Debug, Clone)]
pub struct Initiation {
    /// What the caller must send to the identity provider.
    pub instruction: OutboundInstruction,
    /// Correlation state to store until the response arrives.
    pub state: ExchangeState,
}

/// A protocol response as received by the caller layer.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Request parameters (query string and form body, decoded).
    pub parameters: BTreeMap<String, String>,
    /// Full URL the message was received on, including the query string.
    pub receiving_url: String,
    /// Deadline for any network call made while validating.
    pub deadline: Option<Instant>,
}

impl InboundMessage {
    /// Creates a message received on `receiving_url`.
    #[must_use]
    pub fn new(receiving_url: impl Into<String>) -> Self {
        Self {
            parameters: BTreeMap::new(),
            receiving_url: receiving_url.into(),
            deadline: None,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// Why a response was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Signature missing or not valid.
    SignatureInvalid,
    /// The assertion is intended for another relying party.
    AudienceMismatch,
    /// The response was delivered to an endpoint other than the one requested.
    RecipientMismatch,
    /// Outside the validity window, or a token service did not answer in time.
    Expired,
    /// The message could not be decoded or parsed.
    Malformed,
    /// No positive, correlated assertion is present.
    Unverified,
}

impl RejectReason {
    /// Returns the category of this reason.
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::Malformed | Self::SignatureInvalid => ErrorCategory::ProtocolViolation,
            Self::AudienceMismatch | Self::RecipientMismatch | Self::Expired | Self::Unverified => {
                ErrorCategory::Correlation
            }
        }
    }

    /// Returns the stable name of this reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignatureInvalid => "SignatureInvalid",
            Self::AudienceMismatch => "AudienceMismatch",
            Self::RecipientMismatch => "RecipientMismatch",
            Self::Expired => "Expired",
            Self::Malformed => "Malformed",
            Self::Unverified => "Unverified",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positively validated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// Authenticated subject identifier.
    pub subject_id: String,
    /// Attributes under their protocol identifiers.
    pub raw_attributes: RawAttributes,
}

/// Result of [`ProtocolAdapter::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The response is valid and bound to the expected exchange.
    Verified(Verified),
    /// The response was rejected.
    Rejected(RejectReason),
}

impl ValidationResult {
    /// Creates a verified result.
    #[must_use]
    pub fn verified(subject_id: impl Into<String>, raw_attributes: RawAttributes) -> Self {
        Self::Verified(Verified {
            subject_id: subject_id.into(),
            raw_attributes,
        })
    }

    /// Returns whether the result is verified.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Verified(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

impl From<RejectReason> for ValidationResult {
    fn from(reason: RejectReason) -> Self {
        Self::Rejected(reason)
    }
}

/// A protocol plugin.
///
/// Adapters are built once from an immutable configuration snapshot and
/// shared across concurrent exchanges. They hold no per-call mutable state.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Returns the stable protocol id.
    fn identify(&self) -> &'static str;

    /// Returns the adapter metadata.
    fn descriptor(&self) -> ProtocolDescriptor;

    /// Returns the protocol's own URI convention for an attribute.
    ///
    /// `None` means the protocol has no convention for it.
    fn find_attribute_uri(&self, attribute: DefaultAttribute) -> Option<&'static str>;

    /// Builds an authentication request and its correlation state.
    ///
    /// Performs no network I/O.
    fn initiate(&self, target: &TargetDescriptor) -> ProtocolResult<Initiation>;

    /// Validates a response against the state recorded at initiation.
    ///
    /// Every protocol-level inconsistency yields
    /// [`ValidationResult::Rejected`]; this never fails with an error.
    async fn complete(&self, inbound: &InboundMessage, expected: &ExchangeState)
        -> ValidationResult;

    /// Converts raw protocol attributes into the generic map.
    fn map_attributes(&self, raw: RawAttributes) -> AttributeMap;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_categories() {
        assert_eq!(
            RejectReason::SignatureInvalid.category(),
            ErrorCategory::ProtocolViolation
        );
        assert_eq!(RejectReason::Malformed.category(), ErrorCategory::ProtocolViolation);
        assert_eq!(RejectReason::Unverified.category(), ErrorCategory::Correlation);
        assert_eq!(
            RejectReason::RecipientMismatch.category(),
            ErrorCategory::Correlation
        );
    }

    #[test]
    fn inbound_message_params() {
        let inbound = InboundMessage::new("https://sp/acs")
            .with_param("SAMLResponse", "abc")
            .with_param("RelayState", "r");
        assert_eq!(inbound.param("SAMLResponse"), Some("abc"));
        assert_eq!(inbound.param("missing"), None);
    }

    #[test]
    fn validation_result_helpers() {
        let ok = ValidationResult::verified("alice", RawAttributes::new());
        assert!(ok.is_verified());
        assert_eq!(ok.reject_reason(), None);

        let rejected: ValidationResult = RejectReason::Expired.into();
        assert_eq!(rejected.reject_reason(), Some(RejectReason::Expired));
    }
}
