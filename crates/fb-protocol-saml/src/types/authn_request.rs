//! SAML AuthnRequest.
//!
//! Authentication request message sent by the broker, acting as service
//! provider, to an identity provider.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::constants::{NS_ASSERTION, NS_PROTOCOL};
use crate::xml::escape;

/// SAML Authentication Request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request. Becomes the exchange id.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response must be sent.
    pub assertion_consumer_service_url: String,

    /// The identity provider endpoint the request is sent to.
    pub destination: String,

    /// Binding the identity provider must use for the response.
    pub protocol_binding: String,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Human-readable name of the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,
}

/// Name ID policy of an AuthnRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// Requested name ID format.
    pub format: String,
    /// Whether the IdP may create a new identifier.
    pub allow_create: bool,
}

impl AuthnRequest {
    /// Creates a new AuthnRequest with a fresh ID.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        acs_url: impl Into<String>,
        destination: impl Into<String>,
        protocol_binding: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: acs_url.into(),
            destination: destination.into(),
            protocol_binding: protocol_binding.into(),
            name_id_policy: None,
            provider_name: None,
            force_authn: false,
            is_passive: false,
        }
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, format: impl Into<String>, allow_create: bool) -> Self {
        self.name_id_policy = Some(NameIdPolicy {
            format: format.into(),
            allow_create,
        });
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets ForceAuthn.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets IsPassive.
    #[must_use]
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Serializes the request to XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut optional = String::new();
        if let Some(name) = &self.provider_name {
            optional.push_str(&format!(r#" ProviderName="{}""#, escape(name)));
        }
        if self.force_authn {
            optional.push_str(r#" ForceAuthn="true""#);
        }
        if self.is_passive {
            optional.push_str(r#" IsPassive="true""#);
        }

        let policy = self
            .name_id_policy
            .as_ref()
            .map(|p| {
                format!(
                    r#"<samlp:NameIDPolicy Format="{}" AllowCreate="{}"/>"#,
                    escape(&p.format),
                    p.allow_create
                )
            })
            .unwrap_or_default();

        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{NS_PROTOCOL}" xmlns:saml="{NS_ASSERTION}" ID="{id}" Version="2.0" IssueInstant="{instant}" Destination="{destination}" AssertionConsumerServiceURL="{acs}" ProtocolBinding="{binding}"{optional}><saml:Issuer>{issuer}</saml:Issuer>{policy}</samlp:AuthnRequest>"#,
            id = escape(&self.id),
            instant = self.issue_instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            destination = escape(&self.destination),
            acs = escape(&self.assertion_consumer_service_url),
            binding = escape(&self.protocol_binding),
            issuer = escape(&self.issuer),
        )
    }
}
