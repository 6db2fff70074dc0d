//! Common test utilities and fixtures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use base64::Engine;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use fb_broker::{BrokerConfig, Dispatcher};
use fb_protocol::{InboundMessage, OutboundInstruction, SignatureVerifier, VerificationError};
use fb_protocol_openid::{AssocType, Association, ParameterList};
use fb_protocol_saml::xml::XmlElement;
use fb_session::{CorrelationStore, InMemoryCorrelationStore};

pub const IDP_SSO: &str = "https://idp.example.com/sso";
pub const IDP_ENTITY: &str = "https://idp.example.com";
pub const ACS: &str = "https://rp.example.com/saml/acs";
pub const SP_ENTITY: &str = "https://rp.example.com/saml";

pub const OP: &str = "https://op.example.com/server";
pub const RETURN_TO: &str = "https://rp.example.com/openid/return";
pub const ASSOC_HANDLE: &str = "assoc-1";
pub const MAC_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

pub const STS: &str = "https://sts.example.com/adfs/ls/";
pub const REALM: &str = "urn:broker";
pub const REPLY: &str = "https://rp.example.com/wsfed";

/// Broker configuration with all three protocols enabled.
pub fn broker_toml() -> String {
    format!(
        r#"
[broker]
default_protocol = "saml2"
correlation_ttl_secs = 600

[saml2]
idp_sso_url = "{IDP_SSO}"
idp_entity_id = "{IDP_ENTITY}"
acs_url = "{ACS}"
entity_id = "{SP_ENTITY}"

[openid]
op_endpoint = "{OP}"
return_to = "{RETURN_TO}"

[openid.association]
handle = "{ASSOC_HANDLE}"
mac_key = "{MAC_KEY}"
assoc_type = "HMAC-SHA256"

[ws_federation]
sts_url = "{STS}"
realm = "{REALM}"
reply_url = "{REPLY}"

[attributes.saml2]
last_name = "urn:oid:2.5.4.4"
"#
    )
}

/// Initializes test logging once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fb_broker=debug,fb_protocol_wsfed=debug")
        .with_test_writer()
        .try_init();
}

/// Signature verifier with a fixed answer.
pub struct StubVerifier {
    pub accept: bool,
}

impl SignatureVerifier for StubVerifier {
    fn verify(&self, _document: &str, reference: &str, _issuer: &str) -> Result<(), VerificationError> {
        if self.accept {
            Ok(())
        } else {
            Err(VerificationError::Invalid(reference.to_string()))
        }
    }
}

/// A dispatcher over an in-memory store.
pub struct TestEnv {
    pub dispatcher: Dispatcher,
    pub store: Arc<InMemoryCorrelationStore>,
}

impl TestEnv {
    /// Creates an environment from the default configuration.
    pub fn new() -> anyhow::Result<Self> {
        Self::from_toml(&broker_toml(), true)
    }

    /// Creates an environment whose verifier rejects every signature.
    pub fn with_rejecting_verifier() -> anyhow::Result<Self> {
        Self::from_toml(&broker_toml(), false)
    }

    /// Creates an environment from a configuration document.
    pub fn from_toml(toml: &str, accept_signatures: bool) -> anyhow::Result<Self> {
        init_tracing();

        let config = BrokerConfig::from_toml_str(toml)?;
        let store = Arc::new(InMemoryCorrelationStore::new());
        let dispatcher = Dispatcher::from_config(
            &config,
            Arc::clone(&store) as Arc<dyn CorrelationStore>,
            Arc::new(StubVerifier {
                accept: accept_signatures,
            }),
            None,
        )?;

        Ok(Self { dispatcher, store })
    }
}

pub fn instant(offset_secs: i64) -> String {
    (Utc::now() + ChronoDuration::seconds(offset_secs)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Extracts the request ID from a POST-bound AuthnRequest.
pub fn saml_request_id(instruction: &OutboundInstruction) -> anyhow::Result<String> {
    let encoded = instruction
        .field("SAMLRequest")
        .ok_or_else(|| anyhow::anyhow!("no SAMLRequest field"))?;
    let xml = String::from_utf8(base64::engine::general_purpose::STANDARD.decode(encoded)?)?;
    let root = XmlElement::parse(&xml)?;
    root.attr("ID")
        .map(String::from)
        .ok_or_else(|| anyhow::anyhow!("AuthnRequest has no ID"))
}

/// A signed SAML 2.0 response as the identity provider would post it.
pub fn saml_response(in_response_to: &str, recipient: &str) -> InboundMessage {
    let xml = format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_resp1" Version="2.0" InResponseTo="{in_response_to}" Destination="{recipient}" IssueInstant="{now}">
  <saml:Issuer>{IDP_ENTITY}</saml:Issuer>
  <samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
  <saml:Assertion ID="_assert1" Version="2.0" IssueInstant="{now}">
    <saml:Issuer>{IDP_ENTITY}</saml:Issuer>
    <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>
    <saml:Subject>
      <saml:NameID>alice</saml:NameID>
      <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
        <saml:SubjectConfirmationData InResponseTo="{in_response_to}" Recipient="{recipient}" NotOnOrAfter="{exp}"/>
      </saml:SubjectConfirmation>
    </saml:Subject>
    <saml:Conditions NotBefore="{nb}" NotOnOrAfter="{exp}">
      <saml:AudienceRestriction><saml:Audience>{SP_ENTITY}</saml:Audience></saml:AudienceRestriction>
    </saml:Conditions>
    <saml:AttributeStatement>
      <saml:Attribute Name="urn:oid:2.5.4.4"><saml:AttributeValue>Doe</saml:AttributeValue></saml:Attribute>
      <saml:Attribute Name="urn:example:employee-number"><saml:AttributeValue>4711</saml:AttributeValue></saml:Attribute>
    </saml:AttributeStatement>
  </saml:Assertion>
</samlp:Response>"#,
        now = instant(0),
        nb = instant(-60),
        exp = instant(300),
    );

    InboundMessage::new(recipient).with_param(
        "SAMLResponse",
        base64::engine::general_purpose::STANDARD.encode(xml),
    )
}

/// Returns the `openid.return_to` a checkid_setup redirect asks for.
pub fn openid_return_to(instruction: &OutboundInstruction) -> anyhow::Result<String> {
    instruction
        .query_param("openid.return_to")
        .ok_or_else(|| anyhow::anyhow!("no openid.return_to"))
}

static NONCE_SEQ: AtomicU32 = AtomicU32::new(0);

/// A positive OpenID assertion signed with the shared association.
///
/// Every call carries a fresh `response_nonce`.
pub fn openid_assertion(return_to: &str) -> anyhow::Result<InboundMessage> {
    let nonce = format!("{}a{}", instant(0), NONCE_SEQ.fetch_add(1, Ordering::Relaxed));
    openid_assertion_with_nonce(return_to, &nonce)
}

pub fn openid_assertion_with_nonce(return_to: &str, nonce: &str) -> anyhow::Result<InboundMessage> {
    let mut params = ParameterList::new()
        .with("ns", "http://specs.openid.net/auth/2.0")
        .with("mode", "id_res")
        .with("op_endpoint", OP)
        .with("return_to", return_to)
        .with("response_nonce", nonce)
        .with("assoc_handle", ASSOC_HANDLE)
        .with("claimed_id", "https://op.example.com/id/alice")
        .with("identity", "https://op.example.com/id/alice")
        .with("ns.ax", "http://openid.net/srv/ax/1.0")
        .with("ax.mode", "fetch_response")
        .with("ax.type.last", "http://axschema.org/namePerson/last")
        .with("ax.value.last", "Doe")
        .with(
            "signed",
            "op_endpoint,return_to,response_nonce,assoc_handle,claimed_id,identity,\
             ns.ax,ax.mode,ax.type.last,ax.value.last",
        );

    let association = Association::new(ASSOC_HANDLE, AssocType::HmacSha256, MAC_KEY)?;
    let sig = association.sign(&params)?;
    params.set("sig", sig);

    Ok(params
        .to_query_pairs()
        .into_iter()
        .fold(InboundMessage::new(return_to), |m, (k, v)| m.with_param(k, v)))
}

/// A signed sign-in response from the token service.
pub fn wsfed_response(wctx: &str, receiving_url: &str) -> InboundMessage {
    let wresult = format!(
        r#"<t:RequestSecurityTokenResponse xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">
  <t:Lifetime><wsu:Created xmlns:wsu="urn:wsu">{created}</wsu:Created><wsu:Expires xmlns:wsu="urn:wsu">{expires}</wsu:Expires></t:Lifetime>
  <wsp:AppliesTo xmlns:wsp="urn:wsp"><wsa:EndpointReference xmlns:wsa="urn:wsa"><wsa:Address>{REALM}</wsa:Address></wsa:EndpointReference></wsp:AppliesTo>
  <t:RequestedSecurityToken>
    <saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:1.0:assertion" MajorVersion="1" MinorVersion="1" AssertionID="_a1" Issuer="https://sts.example.com" IssueInstant="{created}">
      <saml:Conditions NotBefore="{created}" NotOnOrAfter="{expires}">
        <saml:AudienceRestrictionCondition><saml:Audience>{REALM}</saml:Audience></saml:AudienceRestrictionCondition>
      </saml:Conditions>
      <saml:AttributeStatement>
        <saml:Subject><saml:NameIdentifier>alice@example.com</saml:NameIdentifier></saml:Subject>
        <saml:Attribute AttributeName="surname" AttributeNamespace="http://schemas.xmlsoap.org/ws/2005/05/identity/claims"><saml:AttributeValue>Doe</saml:AttributeValue></saml:Attribute>
        <saml:Attribute AttributeName="department" AttributeNamespace="urn:corp"><saml:AttributeValue>R&amp;D</saml:AttributeValue></saml:Attribute>
      </saml:AttributeStatement>
      <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>
    </saml:Assertion>
  </t:RequestedSecurityToken>
</t:RequestSecurityTokenResponse>"#,
        created = instant(-60),
        expires = instant(600),
    );

    InboundMessage::new(receiving_url)
        .with_param("wa", "wsignin1.0")
        .with_param("wctx", wctx)
        .with_param("wresult", wresult)
}
