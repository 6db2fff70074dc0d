//! The uniform result of completing an exchange.

use fb_core::AttributeMap;
use fb_protocol::RejectReason;

/// What the calling application receives from [`crate::Dispatcher::complete`].
///
/// ## NIST 800-53 Rev5: IA-6 (Authentication Feedback)
///
/// A failure carries only the [`RejectReason`]. Detail about why a response
/// was rejected goes to the audit log, never to the end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The user was authenticated.
    Success {
        /// Subject identifier asserted by the identity provider.
        user_id: String,
        /// Attributes in the generic model.
        attributes: AttributeMap,
        /// Relay state recorded at initiation.
        relay_state: Option<String>,
    },
    /// The response was rejected or could not be correlated.
    Failure {
        /// Why.
        reason: RejectReason,
    },
}

impl Outcome {
    /// Creates a failure.
    #[must_use]
    pub const fn failure(reason: RejectReason) -> Self {
        Self::Failure { reason }
    }

    /// Returns whether the user was authenticated.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the rejection reason, if any.
    #[must_use]
    pub const fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(*reason),
        }
    }

    /// Returns a message that is safe to show to the end user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Success { .. } => "Authentication succeeded.",
            Self::Failure {
                reason: RejectReason::Expired,
            } => "The sign-in attempt has expired. Please try again.",
            Self::Failure { .. } => "Authentication failed. Please try again.",
        }
    }
}
