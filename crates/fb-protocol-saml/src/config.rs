//! SAML adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::constants::{BINDING_HTTP_POST, BINDING_HTTP_REDIRECT};

/// Binding used to send the AuthnRequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamlBinding {
    /// HTTP-POST binding (auto-submitting form).
    #[default]
    HttpPost,
    /// HTTP-Redirect binding (deflated query string).
    HttpRedirect,
}

impl SamlBinding {
    /// Returns the binding URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::HttpPost => BINDING_HTTP_POST,
            Self::HttpRedirect => BINDING_HTTP_REDIRECT,
        }
    }
}

/// SAML 2.0 service provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamlConfig {
    /// Entity ID of the broker. Defaults to the assertion consumer URL.
    pub entity_id: Option<String>,

    /// Identity provider single sign-on endpoint.
    pub idp_sso_url: Option<String>,

    /// Expected issuer of responses. Not checked when absent.
    pub idp_entity_id: Option<String>,

    /// Absolute assertion consumer service URL.
    pub acs_url: Option<String>,

    /// Assertion consumer service path, joined to the request origin when
    /// `acs_url` is not set.
    pub acs_path: Option<String>,

    /// Binding used to send the AuthnRequest.
    #[serde(default)]
    pub binding: SamlBinding,

    /// Whether AuthnRequests are signed through the request signer.
    #[serde(default)]
    pub sign_requests: bool,

    /// Whether responses must carry a signature over the response or the
    /// assertion.
    #[serde(default = "default_true")]
    pub require_signature: bool,

    /// Allowed clock difference with the identity provider, in seconds.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,

    /// Requested name ID format.
    pub name_id_format: Option<String>,

    /// Human-readable name sent as ProviderName.
    pub provider_name: Option<String>,

    /// Sets ForceAuthn on requests.
    #[serde(default)]
    pub force_authn: bool,

    /// Sets IsPassive on requests.
    #[serde(default)]
    pub is_passive: bool,
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            entity_id: None,
            idp_sso_url: None,
            idp_entity_id: None,
            acs_url: None,
            acs_path: None,
            binding: SamlBinding::default(),
            sign_requests: false,
            require_signature: default_true(),
            clock_skew_secs: default_clock_skew(),
            name_id_format: None,
            provider_name: None,
            force_authn: false,
            is_passive: false,
        }
    }
}

impl SamlConfig {
    /// Creates a configuration for an identity provider endpoint and an
    /// assertion consumer URL.
    #[must_use]
    pub fn new(idp_sso_url: impl Into<String>, acs_url: impl Into<String>) -> Self {
        Self {
            idp_sso_url: Some(idp_sso_url.into()),
            acs_url: Some(acs_url.into()),
            ..Self::default()
        }
    }

    /// Sets the entity ID.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets the binding.
    #[must_use]
    pub const fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Sets whether responses must be signed.
    #[must_use]
    pub const fn require_signature(mut self, require: bool) -> Self {
        self.require_signature = require;
        self
    }

    /// Returns the clock skew.
    #[must_use]
    pub const fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }

    /// Validates the configuration.
    ///
    /// A target descriptor may override the identity provider endpoint per
    /// request, but a default endpoint and a return address are required.
    pub fn validate(&self) -> Result<(), String> {
        if self.acs_url.is_none() && self.acs_path.is_none() {
            return Err("saml2: acs_url or acs_path is required".to_string());
        }
        if self.idp_sso_url.is_none() {
            return Err("saml2: idp_sso_url is required".to_string());
        }
        if let Some(url) = &self.acs_url {
            url::Url::parse(url).map_err(|e| format!("saml2: invalid acs_url: {e}"))?;
        }
        if let Some(url) = &self.idp_sso_url {
            url::Url::parse(url).map_err(|e| format!("saml2: invalid idp_sso_url: {e}"))?;
        }
        if self.entity_id.is_none() && self.acs_url.is_none() {
            return Err(
                "saml2: entity_id is required when the ACS URL is derived from the request"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

const fn default_clock_skew() -> u64 {
    300
}
