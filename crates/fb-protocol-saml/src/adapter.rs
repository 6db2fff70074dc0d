//! SAML 2.0 protocol adapter.
//!
//! ## NIST 800-53 Rev5: IA-2 (Identification and Authentication)
//!
//! Responses are bound to the AuthnRequest that produced them through
//! `InResponseTo` and to the assertion consumer endpoint through
//! `Destination` and the bearer `Recipient`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fb_core::{AttributeMap, AttributeMapping, AttributeUriTable, DefaultAttribute, RawAttributes};
use fb_protocol::endpoint::{resolve_endpoint, without_query};
use fb_protocol::{
    protocol_id, Capability, InboundMessage, Initiation, ProtocolAdapter, ProtocolDescriptor,
    ProtocolError, ProtocolResult, RejectReason, RequestSigner, SignatureVerifier,
    TargetDescriptor, ValidationResult,
};
use fb_session::ExchangeState;
use tracing::{debug, warn};

use crate::bindings::{HttpPostBinding, HttpRedirectBinding};
use crate::config::{SamlBinding, SamlConfig};
use crate::types::constants::{BINDING_HTTP_POST, MAX_RELAY_STATE_BYTES};
use crate::types::{AuthnRequest, SamlAssertion, SamlResponse};

/// Extension key recording the entity ID used as issuer and audience.
const EXT_ENTITY_ID: &str = "entity_id";

/// SAML 2.0 Web Browser SSO adapter.
pub struct Saml2Adapter {
    config: SamlConfig,
    mapping: AttributeMapping,
    verifier: Arc<dyn SignatureVerifier>,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl Saml2Adapter {
    /// Creates the adapter.
    pub fn new(
        config: SamlConfig,
        attributes: &AttributeUriTable,
        verifier: Arc<dyn SignatureVerifier>,
        signer: Option<Arc<dyn RequestSigner>>,
    ) -> ProtocolResult<Self> {
        config.validate().map_err(ProtocolError::Configuration)?;
        if config.sign_requests && signer.is_none() {
            return Err(ProtocolError::Configuration(
                "saml2: sign_requests is set but no request signer is available".to_string(),
            ));
        }

        Ok(Self {
            mapping: AttributeMapping::new(protocol_id::SAML2, attributes, x500_uri),
            config,
            verifier,
            signer,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SamlConfig {
        &self.config
    }

    fn signer(&self) -> Option<&dyn RequestSigner> {
        if self.config.sign_requests {
            self.signer.as_deref()
        } else {
            None
        }
    }

    fn validate(&self, inbound: &InboundMessage, expected: &ExchangeState) -> ValidationResult {
        let Some(encoded) = inbound.param("SAMLResponse") else {
            debug!("no SAMLResponse parameter");
            return RejectReason::Malformed.into();
        };

        let (xml, response) = match HttpPostBinding::decode_response(encoded)
            .and_then(|xml| SamlResponse::parse(&xml).map(|r| (xml, r)))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "SAML response could not be parsed");
                return e.reject_reason().into();
            }
        };

        if !response.is_success() {
            debug!(
                status = %response.status_code,
                message = response.status_message.as_deref().unwrap_or("-"),
                "identity provider returned a failure status"
            );
            return RejectReason::Unverified.into();
        }

        if response.in_response_to.as_deref() != Some(expected.exchange_id.as_str()) {
            debug!(
                expected = %expected.exchange_id,
                actual = response.in_response_to.as_deref().unwrap_or("-"),
                "InResponseTo does not match the outstanding request"
            );
            return RejectReason::Unverified.into();
        }

        let Some(assertion) = response.assertion() else {
            if response.has_encrypted_assertion {
                warn!("encrypted assertions are not supported");
            }
            return RejectReason::Unverified.into();
        };

        if let Some(reason) = check_recipient(&response, assertion, inbound, expected) {
            return reason.into();
        }

        if let Some(reason) = self.check_signature(&xml, &response, assertion) {
            return reason.into();
        }

        if let Some(expected_issuer) = &self.config.idp_entity_id {
            let issuer = assertion.issuer.as_ref().or(response.issuer.as_ref());
            if issuer != Some(expected_issuer) {
                debug!(issuer = ?issuer, "unexpected issuer");
                return RejectReason::Unverified.into();
            }
        }

        if assertion
            .confirmation
            .as_ref()
            .and_then(|c| c.in_response_to.as_deref())
            .is_some_and(|id| id != expected.exchange_id)
        {
            debug!("subject confirmation answers a different request");
            return RejectReason::Unverified.into();
        }

        let audience = expected
            .extension(EXT_ENTITY_ID)
            .unwrap_or(expected.recipient.as_str());
        if !assertion.has_audience(audience) {
            debug!(audience, found = ?assertion.audiences, "audience mismatch");
            return RejectReason::AudienceMismatch.into();
        }

        if !assertion.is_valid_at(Utc::now(), self.config.clock_skew()) {
            debug!(assertion = %assertion.id, "assertion outside its validity window");
            return RejectReason::Expired.into();
        }

        match &assertion.subject {
            Some(subject) => ValidationResult::verified(subject, assertion.attributes.clone()),
            None => RejectReason::Unverified.into(),
        }
    }

    fn check_signature(
        &self,
        xml: &str,
        response: &SamlResponse,
        assertion: &SamlAssertion,
    ) -> Option<RejectReason> {
        let issuer = assertion
            .issuer
            .as_deref()
            .or(response.issuer.as_deref())
            .unwrap_or_default();

        let mut references = Vec::new();
        if response.signed {
            references.push(response.id.as_str());
        }
        if assertion.signed {
            references.push(assertion.id.as_str());
        }

        if references.is_empty() {
            if self.config.require_signature {
                warn!(response = %response.id, "unsigned SAML response rejected");
                return Some(RejectReason::SignatureInvalid);
            }
            return None;
        }

        for reference in references {
            if let Err(e) = self.verifier.verify(xml, reference, issuer) {
                warn!(reference, error = %e, "SAML signature rejected");
                return Some(RejectReason::SignatureInvalid);
            }
        }
        None
    }
}

/// Checks `Destination`, the bearer `Recipient` and the receiving endpoint
/// against the recorded assertion consumer URL.
fn check_recipient(
    response: &SamlResponse,
    assertion: &SamlAssertion,
    inbound: &InboundMessage,
    expected: &ExchangeState,
) -> Option<RejectReason> {
    let recipient = expected.recipient.as_str();

    if response
        .destination
        .as_deref()
        .is_some_and(|d| d != recipient)
    {
        debug!(destination = ?response.destination, recipient, "Destination mismatch");
        return Some(RejectReason::RecipientMismatch);
    }

    if assertion
        .confirmation
        .as_ref()
        .and_then(|c| c.recipient.as_deref())
        .is_some_and(|r| r != recipient)
    {
        debug!(recipient, "subject confirmation Recipient mismatch");
        return Some(RejectReason::RecipientMismatch);
    }

    if !inbound.receiving_url.is_empty()
        && without_query(&inbound.receiving_url) != without_query(recipient)
    {
        debug!(received_on = %inbound.receiving_url, recipient, "response delivered to another endpoint");
        return Some(RejectReason::RecipientMismatch);
    }

    None
}

/// X.500/LDAP attribute profile OIDs (SAML V2.0 X.500/LDAP Attribute Profile).
fn x500_uri(attribute: DefaultAttribute) -> Option<&'static str> {
    match attribute {
        DefaultAttribute::LastName => Some("urn:oid:2.5.4.4"),
        DefaultAttribute::FirstName => Some("urn:oid:2.5.4.42"),
        DefaultAttribute::Name => Some("urn:oid:2.5.4.3"),
        DefaultAttribute::Address => Some("urn:oid:2.5.4.9"),
        DefaultAttribute::Locality => Some("urn:oid:2.5.4.7"),
        DefaultAttribute::PostalCode => Some("urn:oid:2.5.4.17"),
        DefaultAttribute::Identifier => Some("urn:oid:1.3.6.1.4.1.5923.1.1.1.10"),
        DefaultAttribute::Photo => Some("urn:oid:0.9.2342.19200300.100.1.60"),
        DefaultAttribute::Gender
        | DefaultAttribute::DateOfBirth
        | DefaultAttribute::PlaceOfBirth
        | DefaultAttribute::Nationality => None,
    }
}

#[async_trait]
impl ProtocolAdapter for Saml2Adapter {
    fn identify(&self) -> &'static str {
        protocol_id::SAML2
    }

    fn descriptor(&self) -> ProtocolDescriptor {
        let descriptor = ProtocolDescriptor::new(protocol_id::SAML2, "SAML 2.0");
        if self.config.sign_requests {
            descriptor.with_capability(Capability::SignedRequests)
        } else {
            descriptor
        }
    }

    fn find_attribute_uri(&self, attribute: DefaultAttribute) -> Option<&'static str> {
        x500_uri(attribute)
    }

    fn initiate(&self, target: &TargetDescriptor) -> ProtocolResult<Initiation> {
        let relay_state = target.relay_state.as_deref();
        if relay_state.is_some_and(|rs| rs.len() > MAX_RELAY_STATE_BYTES) {
            return Err(ProtocolError::Encoding(format!(
                "RelayState exceeds {MAX_RELAY_STATE_BYTES} bytes"
            )));
        }

        let acs = resolve_endpoint(
            self.config.acs_url.as_deref(),
            self.config.acs_path.as_deref(),
            target.origin.as_deref(),
            "assertion consumer service",
        )?;
        let entity_id = self.config.entity_id.clone().unwrap_or_else(|| acs.clone());
        let destination = target
            .idp_destination
            .as_deref()
            .or(self.config.idp_sso_url.as_deref())
            .ok_or_else(|| {
                ProtocolError::Configuration("saml2: no identity provider endpoint".to_string())
            })?;

        let mut request = AuthnRequest::new(&entity_id, &acs, destination, BINDING_HTTP_POST)
            .force_authn(self.config.force_authn)
            .is_passive(self.config.is_passive);
        if let Some(format) = &self.config.name_id_format {
            request = request.with_name_id_policy(format, true);
        }
        if let Some(name) = &self.config.provider_name {
            request = request.with_provider_name(name);
        }

        let xml = request.to_xml();
        let instruction = match (self.config.binding, self.signer()) {
            (SamlBinding::HttpPost, None) => {
                HttpPostBinding::encode_request(&xml, destination, relay_state)
            }
            (SamlBinding::HttpPost, Some(signer)) => {
                let signed = signer.sign_xml(&xml, &request.id)?;
                HttpPostBinding::encode_request(&signed, destination, relay_state)
            }
            (SamlBinding::HttpRedirect, None) => {
                HttpRedirectBinding::encode_request(&xml, destination, relay_state)?
            }
            (SamlBinding::HttpRedirect, Some(signer)) => {
                HttpRedirectBinding::encode_signed_request(&xml, destination, relay_state, signer)?
            }
        };

        debug!(request_id = %request.id, destination, acs = %acs, "built AuthnRequest");

        let state = ExchangeState::new(protocol_id::SAML2, request.id, acs)
            .with_relay_state(target.relay_state.clone())
            .with_extension(EXT_ENTITY_ID, entity_id);

        Ok(Initiation { instruction, state })
    }

    async fn complete(
        &self,
        inbound: &InboundMessage,
        expected: &ExchangeState,
    ) -> ValidationResult {
        self.validate(inbound, expected)
    }

    fn map_attributes(&self, raw: RawAttributes) -> AttributeMap {
        self.mapping.to_attribute_map(raw)
    }
}
