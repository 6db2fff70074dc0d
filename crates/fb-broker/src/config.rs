//! Broker configuration.
//!
//! Configuration is one TOML document, loaded once at startup and treated as
//! an immutable snapshot afterwards. A protocol is enabled when its section
//! is present.
//!
//! ```toml
//! [broker]
//! default_protocol = "saml2"
//! correlation_ttl_secs = 600
//!
//! [saml2]
//! idp_sso_url = "https://idp.example.com/sso"
//! acs_url = "https://rp.example.com/saml/acs"
//!
//! [attributes.saml2]
//! last_name = "urn:oid:2.5.4.4"
//!
//! [trace]
//! enabled = false
//! ```

use std::path::Path;
use std::time::Duration;

use fb_core::AttributeUriTable;
use fb_protocol::protocol_id;
use fb_protocol_openid::OpenIdConfig;
use fb_protocol_saml::SamlConfig;
use fb_protocol_wsfed::WsFedConfig;
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, BrokerResult};

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSection {
    /// Protocol used when the caller does not name one.
    pub default_protocol: Option<String>,

    /// How long correlation state stays usable, in seconds.
    #[serde(default = "default_correlation_ttl")]
    pub correlation_ttl_secs: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            default_protocol: None,
            correlation_ttl_secs: default_correlation_ttl(),
        }
    }
}

/// Diagnostic tracing of token service traffic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Whether message bodies are logged at debug level.
    #[serde(default)]
    pub enabled: bool,
}

/// The full broker configuration snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Dispatcher settings.
    #[serde(default)]
    pub broker: BrokerSection,

    /// SAML 2.0 settings.
    pub saml2: Option<SamlConfig>,

    /// OpenID 2.0 settings.
    pub openid: Option<OpenIdConfig>,

    /// WS-Federation settings.
    pub ws_federation: Option<WsFedConfig>,

    /// Per-protocol attribute URI overrides.
    #[serde(default)]
    pub attributes: AttributeUriTable,

    /// Diagnostic trace settings.
    #[serde(default)]
    pub trace: TraceConfig,
}

impl BrokerConfig {
    /// Parses a configuration document.
    pub fn from_toml_str(content: &str) -> BrokerResult<Self> {
        toml::from_str(content)
            .map_err(|e| BrokerError::Configuration(format!("failed to parse config: {e}")))
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> BrokerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Returns the correlation state lifetime.
    #[must_use]
    pub const fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.broker.correlation_ttl_secs)
    }

    /// Returns the ids of the protocols with a configuration section.
    #[must_use]
    pub fn enabled_protocols(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();
        if self.saml2.is_some() {
            enabled.push(protocol_id::SAML2);
        }
        if self.openid.is_some() {
            enabled.push(protocol_id::OPENID);
        }
        if self.ws_federation.is_some() {
            enabled.push(protocol_id::WS_FEDERATION);
        }
        enabled
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BrokerResult<()> {
        let enabled = self.enabled_protocols();
        if enabled.is_empty() {
            return Err(BrokerError::Configuration(
                "no protocol is configured".to_string(),
            ));
        }

        if let Some(default) = &self.broker.default_protocol {
            if !enabled.contains(&default.as_str()) {
                return Err(BrokerError::Configuration(format!(
                    "default_protocol {default} is not configured"
                )));
            }
        }

        if self.broker.correlation_ttl_secs == 0 {
            return Err(BrokerError::Configuration(
                "correlation_ttl_secs must be positive".to_string(),
            ));
        }

        self.attributes.validate()?;
        for protocol in self.attributes.protocols() {
            if ![protocol_id::SAML2, protocol_id::OPENID, protocol_id::WS_FEDERATION]
                .contains(&protocol)
            {
                return Err(BrokerError::Configuration(format!(
                    "attribute overrides for unknown protocol {protocol}"
                )));
            }
        }

        let sections = [
            self.saml2.as_ref().map(SamlConfig::validate),
            self.openid.as_ref().map(OpenIdConfig::validate),
            self.ws_federation.as_ref().map(WsFedConfig::validate),
        ];
        for result in sections.into_iter().flatten() {
            result.map_err(BrokerError::Configuration)?;
        }

        Ok(())
    }
}

const fn default_correlation_ttl() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::DefaultAttribute;
    use std::io::Write;

    const CONFIG: &str = r#"
[broker]
default_protocol = "saml2"

[saml2]
idp_sso_url = "https://idp.example.com/sso"
acs_url = "https://rp.example.com/saml/acs"
entity_id = "urn:broker"
idp_entity_id = "https://idp.example.com"

[ws_federation]
sts_url = "https://sts.example.com/adfs/ls/"
realm = "urn:broker"
reply_path = "/wsfed"

[attributes.saml2]
last_name = "urn:oid:2.5.4.4"

[attributes.ws-federation]
first_name = "http://schemas.example.com/claims/given"

[trace]
enabled = true
"#;

    #[test]
    fn parses_full_document() {
        let config = BrokerConfig::from_toml_str(CONFIG).unwrap();

        config.validate().unwrap();
        assert_eq!(config.correlation_ttl(), Duration::from_secs(600));
        assert_eq!(
            config.enabled_protocols(),
            vec![protocol_id::SAML2, protocol_id::WS_FEDERATION]
        );
        assert_eq!(
            config
                .attributes
                .resolve_uri(protocol_id::SAML2, DefaultAttribute::LastName),
            Some("urn:oid:2.5.4.4")
        );
        assert!(config.trace.enabled);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = BrokerConfig::load(file.path()).unwrap();
        assert_eq!(config.broker.default_protocol.as_deref(), Some("saml2"));

        assert!(matches!(
            BrokerConfig::load("/nonexistent/broker.toml"),
            Err(BrokerError::Configuration(_))
        ));
    }

    #[test]
    fn requires_a_protocol() {
        let config = BrokerConfig::from_toml_str("[broker]\ncorrelation_ttl_secs = 60\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_must_be_configured() {
        let mut config = BrokerConfig::from_toml_str(CONFIG).unwrap();
        config.broker.default_protocol = Some(protocol_id::OPENID.into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_sections() {
        let mut config = BrokerConfig::from_toml_str(CONFIG).unwrap();
        config.broker.correlation_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BrokerConfig::from_toml_str(CONFIG).unwrap();
        if let Some(saml) = config.saml2.as_mut() {
            saml.idp_sso_url = None;
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("saml2"));

        let config = BrokerConfig::from_toml_str(&format!(
            "{CONFIG}\n[attributes.cas]\nname = \"uid\"\n"
        ))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unparseable_documents() {
        assert!(matches!(
            BrokerConfig::from_toml_str("[broker"),
            Err(BrokerError::Configuration(_))
        ));
    }
}
