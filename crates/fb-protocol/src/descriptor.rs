//! Static per-adapter metadata.

use serde::Serialize;

/// Stable protocol identifiers used for dispatch and attribute lookups.
pub mod protocol_id {
    /// SAML 2.0 Web Browser SSO.
    pub const SAML2: &str = "saml2";
    /// OpenID Authentication 2.0.
    pub const OPENID: &str = "openid";
    /// WS-Federation passive requestor profile.
    pub const WS_FEDERATION: &str = "ws-federation";
}

/// Capabilities an adapter may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Reports a stable protocol id.
    Identify,
    /// Builds authentication requests.
    Initiate,
    /// Validates authentication responses.
    Complete,
    /// Converts protocol attributes to the generic map.
    MapAttributes,
    /// Requests are signed through the request signer.
    SignedRequests,
    /// Tokens can be validated by an external security token service.
    TokenServiceValidation,
    /// Attributes can be requested explicitly in the authentication request.
    AttributeRequest,
}

/// Protocol identifier and capability set of one adapter.
///
/// Built once at startup; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolDescriptor {
    /// Protocol id.
    pub id: &'static str,
    /// Human-readable protocol name.
    pub name: &'static str,
    /// Offered capabilities.
    pub capabilities: Vec<Capability>,
}

impl ProtocolDescriptor {
    /// Capabilities every adapter offers.
    pub const BASE_CAPABILITIES: [Capability; 4] = [
        Capability::Identify,
        Capability::Initiate,
        Capability::Complete,
        Capability::MapAttributes,
    ];

    /// Creates a descriptor with the base capabilities.
    #[must_use]
    pub fn new(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            capabilities: Self::BASE_CAPABILITIES.to_vec(),
        }
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Checks if the adapter offers a capability.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
