//! The closed set of protocol adapters.
//!
//! Supported protocols are known at compile time. A new protocol is added as
//! a variant here; there is no runtime plugin loading.

use std::fmt;

use async_trait::async_trait;
use fb_core::{AttributeMap, DefaultAttribute, RawAttributes};
use fb_protocol::{
    InboundMessage, Initiation, ProtocolAdapter, ProtocolDescriptor, ProtocolResult,
    TargetDescriptor, ValidationResult,
};
use fb_protocol_openid::OpenIdAdapter;
use fb_protocol_saml::Saml2Adapter;
use fb_protocol_wsfed::WsFedAdapter;
use fb_session::ExchangeState;

/// A configured protocol adapter.
pub enum Adapter {
    /// SAML 2.0 Web Browser SSO.
    Saml2(Saml2Adapter),
    /// OpenID Authentication 2.0.
    OpenId(OpenIdAdapter),
    /// WS-Federation passive requestor.
    WsFederation(WsFedAdapter),
}

impl Adapter {
    fn inner(&self) -> &dyn ProtocolAdapter {
        match self {
            Self::Saml2(a) => a,
            Self::OpenId(a) => a,
            Self::WsFederation(a) => a,
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Adapter").field(&self.identify()).finish()
    }
}

impl From<Saml2Adapter> for Adapter {
    fn from(adapter: Saml2Adapter) -> Self {
        Self::Saml2(adapter)
    }
}

impl From<OpenIdAdapter> for Adapter {
    fn from(adapter: OpenIdAdapter) -> Self {
        Self::OpenId(adapter)
    }
}

impl From<WsFedAdapter> for Adapter {
    fn from(adapter: WsFedAdapter) -> Self {
        Self::WsFederation(adapter)
    }
}

#[async_trait]
impl ProtocolAdapter for Adapter {
    fn identify(&self) -> &'static str {
        self.inner().identify()
    }

    fn descriptor(&self) -> ProtocolDescriptor {
        self.inner().descriptor()
    }

    fn find_attribute_uri(&self, attribute: DefaultAttribute) -> Option<&'static str> {
        self.inner().find_attribute_uri(attribute)
    }

    fn initiate(&self, target: &TargetDescriptor) -> ProtocolResult<Initiation> {
        self.inner().initiate(target)
    }

    async fn complete(
        &self,
        inbound: &InboundMessage,
        expected: &ExchangeState,
    ) -> ValidationResult {
        self.inner().complete(inbound, expected).await
    }

    fn map_attributes(&self, raw: RawAttributes) -> AttributeMap {
        self.inner().map_attributes(raw)
    }
}
