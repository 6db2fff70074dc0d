//! WS-Federation protocol adapter.
//!
//! ## NIST 800-53 Rev5: IA-2 (Identification and Authentication)
//!
//! A token response is bound to its sign-in request by the `wctx` context
//! value and to the reply address the request named.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fb_core::{AttributeMap, AttributeMapping, AttributeUriTable, DefaultAttribute, RawAttributes};
use fb_protocol::endpoint::{resolve_endpoint, without_query};
use fb_protocol::{
    protocol_id, Capability, InboundMessage, Initiation, OutboundInstruction, ProtocolAdapter,
    ProtocolDescriptor, ProtocolError, ProtocolResult, RejectReason, SignatureVerifier,
    TargetDescriptor, ValidationResult,
};
use fb_session::ExchangeState;
use tracing::{debug, warn};

use crate::config::WsFedConfig;
use crate::request::{SignInRequest, WSIGNIN};
use crate::rstr::RequestSecurityTokenResponse;
use crate::sts::{HttpSecurityTokenService, SecurityTokenService, TransportError};
use crate::trace::TraceHook;

/// WS-Federation passive requestor adapter.
pub struct WsFedAdapter {
    config: WsFedConfig,
    mapping: AttributeMapping,
    verifier: Arc<dyn SignatureVerifier>,
    token_service: Option<Arc<dyn SecurityTokenService>>,
}

impl WsFedAdapter {
    /// Creates the adapter.
    ///
    /// When token validation is configured, an HTTP token service client is
    /// created with `trace` attached.
    pub fn new(
        config: WsFedConfig,
        attributes: &AttributeUriTable,
        verifier: Arc<dyn SignatureVerifier>,
        trace: Arc<dyn TraceHook>,
    ) -> ProtocolResult<Self> {
        config.validate().map_err(ProtocolError::Configuration)?;

        let token_service = match config.validating_token_service() {
            Some(ts) => {
                let client = HttpSecurityTokenService::new(&ts.endpoint, ts.timeout())
                    .map_err(|e| ProtocolError::Configuration(e.to_string()))?
                    .with_trace_hook(trace);
                Some(Arc::new(client) as Arc<dyn SecurityTokenService>)
            }
            None => None,
        };

        Ok(Self {
            mapping: AttributeMapping::new(protocol_id::WS_FEDERATION, attributes, claim_uri),
            config,
            verifier,
            token_service,
        })
    }

    /// Replaces the token service client.
    #[must_use]
    pub fn with_token_service(mut self, token_service: Arc<dyn SecurityTokenService>) -> Self {
        self.token_service = Some(token_service);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WsFedConfig {
        &self.config
    }

    async fn validate(&self, inbound: &InboundMessage, expected: &ExchangeState) -> ValidationResult {
        let (Some(WSIGNIN), Some(wresult)) = (inbound.param("wa"), inbound.param("wresult")) else {
            warn!(wa = inbound.param("wa").unwrap_or("-"), "not a sign-in response");
            return RejectReason::Malformed.into();
        };

        if inbound.param("wctx") != Some(expected.exchange_id.as_str()) {
            debug!("wctx does not match the outstanding request");
            return RejectReason::Unverified.into();
        }

        if !inbound.receiving_url.is_empty()
            && without_query(&inbound.receiving_url) != without_query(&expected.recipient)
        {
            debug!(received_on = %inbound.receiving_url, recipient = %expected.recipient, "response delivered to another endpoint");
            return RejectReason::RecipientMismatch.into();
        }

        let rstr = match RequestSecurityTokenResponse::parse(wresult) {
            Ok(rstr) => rstr,
            Err(e) => {
                warn!(error = %e, "token response could not be parsed");
                return e.reject_reason().into();
            }
        };
        let assertion = &rstr.assertion;

        if assertion
            .confirmation
            .as_ref()
            .and_then(|c| c.recipient.as_deref())
            .is_some_and(|r| r != expected.recipient)
        {
            debug!("subject confirmation Recipient mismatch");
            return RejectReason::RecipientMismatch.into();
        }

        if let Some(reason) = self.check_token(wresult, &rstr, inbound).await {
            return reason.into();
        }

        if rstr.applies_to.as_deref().is_some_and(|a| a != self.config.realm)
            || !assertion.has_audience(&self.config.realm)
        {
            debug!(applies_to = ?rstr.applies_to, audiences = ?assertion.audiences, "token issued for another realm");
            return RejectReason::AudienceMismatch.into();
        }

        let now = Utc::now();
        if !rstr.is_current(now, self.config.clock_skew())
            || !assertion.is_valid_at(now, self.config.clock_skew())
        {
            debug!(assertion = %assertion.id, "token outside its lifetime");
            return RejectReason::Expired.into();
        }

        match &assertion.subject {
            Some(subject) => ValidationResult::verified(subject, assertion.attributes.clone()),
            None => RejectReason::Unverified.into(),
        }
    }

    /// Verifies the token signature and, when configured, asks the token
    /// service for its verdict.
    async fn check_token(
        &self,
        wresult: &str,
        rstr: &RequestSecurityTokenResponse,
        inbound: &InboundMessage,
    ) -> Option<RejectReason> {
        let assertion = &rstr.assertion;

        if assertion.signed {
            let issuer = assertion.issuer.as_deref().unwrap_or_default();
            if let Err(e) = self.verifier.verify(wresult, &assertion.id, issuer) {
                warn!(error = %e, "token signature rejected");
                return Some(RejectReason::SignatureInvalid);
            }
        } else if self.config.require_signed_tokens && self.token_service.is_none() {
            warn!(assertion = %assertion.id, "unsigned token rejected");
            return Some(RejectReason::SignatureInvalid);
        }

        let service = self.token_service.as_ref()?;
        match service.validate(&rstr.token_xml, inbound.deadline).await {
            Ok(validation) if validation.is_valid() => None,
            Ok(validation) => {
                warn!(code = %validation.code, reason = validation.reason.as_deref().unwrap_or("-"), "token service rejected the token");
                Some(RejectReason::SignatureInvalid)
            }
            Err(TransportError::Fault(reason)) => {
                warn!(reason = %reason, "token service refused the token with a fault");
                Some(RejectReason::SignatureInvalid)
            }
            Err(_) => Some(RejectReason::Expired),
        }
    }
}

/// WS-Federation uses the claim type URIs.
fn claim_uri(attribute: DefaultAttribute) -> Option<&'static str> {
    attribute
        .is_standard_claim()
        .then(|| attribute.default_uri())
}

#[async_trait]
impl ProtocolAdapter for WsFedAdapter {
    fn identify(&self) -> &'static str {
        protocol_id::WS_FEDERATION
    }

    fn descriptor(&self) -> ProtocolDescriptor {
        let descriptor = ProtocolDescriptor::new(protocol_id::WS_FEDERATION, "WS-Federation");
        if self.token_service.is_some() {
            descriptor.with_capability(Capability::TokenServiceValidation)
        } else {
            descriptor
        }
    }

    fn find_attribute_uri(&self, attribute: DefaultAttribute) -> Option<&'static str> {
        claim_uri(attribute)
    }

    fn initiate(&self, target: &TargetDescriptor) -> ProtocolResult<Initiation> {
        let reply = resolve_endpoint(
            self.config.reply_url.as_deref(),
            self.config.reply_path.as_deref(),
            target.origin.as_deref(),
            "reply",
        )?;

        let request = SignInRequest::new(&self.config.realm, &reply)
            .with_home_realm(self.config.home_realm.clone())
            .with_language(target.language.clone());
        let sts_url = target
            .idp_destination
            .as_deref()
            .unwrap_or(&self.config.sts_url);
        let url = request.to_url(sts_url);

        debug!(sts_url, wctx = %request.context, reply = %reply, "built wsignin1.0 request");

        let state = ExchangeState::new(protocol_id::WS_FEDERATION, request.context, reply)
            .with_relay_state(target.relay_state.clone());

        Ok(Initiation {
            instruction: OutboundInstruction::Redirect { url },
            state,
        })
    }

    async fn complete(
        &self,
        inbound: &InboundMessage,
        expected: &ExchangeState,
    ) -> ValidationResult {
        self.validate(inbound, expected).await
    }

    fn map_attributes(&self, raw: RawAttributes) -> AttributeMap {
        self.mapping.to_attribute_map(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chrono::{Duration as ChronoDuration, SecondsFormat};
    use fb_protocol::VerificationError;

    use super::*;
    use crate::sts::{TokenValidation, STATUS_VALID};
    use crate::trace::NoopTraceHook;

    const STS: &str = "https://sts.example.com/adfs/ls/";
    const REALM: &str = "urn:broker";
    const REPLY: &str = "https://rp.example.com/wsfed";

    struct AcceptAll;

    impl SignatureVerifier for AcceptAll {
        fn verify(&self, _doc: &str, _reference: &str, _issuer: &str) -> Result<(), VerificationError> {
            Ok(())
        }
    }

    struct FixedService(Result<TokenValidation, TransportError>);

    #[async_trait]
    impl SecurityTokenService for FixedService {
        async fn validate(
            &self,
            _token_xml: &str,
            _deadline: Option<Instant>,
        ) -> Result<TokenValidation, TransportError> {
            self.0.clone()
        }
    }

    fn adapter() -> WsFedAdapter {
        WsFedAdapter::new(
            WsFedConfig::new(STS, REALM, REPLY),
            &AttributeUriTable::new(),
            Arc::new(AcceptAll),
            Arc::new(NoopTraceHook),
        )
        .unwrap()
    }

    fn wresult(audience: &str, signed: bool, expires_in: i64) -> String {
        let now = Utc::now();
        let ts = |d: i64| (now + ChronoDuration::seconds(d)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let signature = if signed {
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>"#
        } else {
            ""
        };
        format!(
            r#"<t:RequestSecurityTokenResponse xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">
  <t:Lifetime><wsu:Created xmlns:wsu="urn:wsu">{created}</wsu:Created><wsu:Expires xmlns:wsu="urn:wsu">{expires}</wsu:Expires></t:Lifetime>
  <wsp:AppliesTo xmlns:wsp="urn:wsp"><wsa:EndpointReference xmlns:wsa="urn:wsa"><wsa:Address>{audience}</wsa:Address></wsa:EndpointReference></wsp:AppliesTo>
  <t:RequestedSecurityToken>
    <saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:1.0:assertion" MajorVersion="1" MinorVersion="1" AssertionID="_a1" Issuer="https://sts.example.com" IssueInstant="{created}">
      <saml:Conditions NotBefore="{created}" NotOnOrAfter="{expires}">
        <saml:AudienceRestrictionCondition><saml:Audience>{audience}</saml:Audience></saml:AudienceRestrictionCondition>
      </saml:Conditions>
      <saml:AttributeStatement>
        <saml:Subject><saml:NameIdentifier>alice@example.com</saml:NameIdentifier></saml:Subject>
        <saml:Attribute AttributeName="surname" AttributeNamespace="http://schemas.xmlsoap.org/ws/2005/05/identity/claims"><saml:AttributeValue>Doe</saml:AttributeValue></saml:Attribute>
        <saml:Attribute AttributeName="department" AttributeNamespace="urn:corp"><saml:AttributeValue>R&amp;D</saml:AttributeValue></saml:Attribute>
      </saml:AttributeStatement>
      {signature}
    </saml:Assertion>
  </t:RequestedSecurityToken>
</t:RequestSecurityTokenResponse>"#,
            created = ts(-60),
            expires = ts(expires_in),
        )
    }

    fn response(state: &ExchangeState, wresult: String) -> InboundMessage {
        InboundMessage::new(REPLY)
            .with_param("wa", "wsignin1.0")
            .with_param("wctx", state.exchange_id.clone())
            .with_param("wresult", wresult)
    }

    #[test]
    fn initiate_redirects_to_sts() {
        let initiation = adapter()
            .initiate(&TargetDescriptor::new().with_relay_state("r"))
            .unwrap();

        let instruction = &initiation.instruction;
        assert!(instruction.url().starts_with(STS));
        assert_eq!(instruction.query_param("wa").as_deref(), Some("wsignin1.0"));
        assert_eq!(instruction.query_param("wtrealm").as_deref(), Some(REALM));
        assert_eq!(instruction.query_param("wreply").as_deref(), Some(REPLY));
        assert_eq!(
            instruction.query_param("wctx").as_deref(),
            Some(initiation.state.exchange_id.as_str())
        );
        assert_eq!(initiation.state.recipient, REPLY);
    }

    #[tokio::test]
    async fn verifies_signed_token() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, true, 600)), &state)
            .await;

        let ValidationResult::Verified(verified) = result else {
            panic!("expected verified, got {result:?}");
        };
        assert_eq!(verified.subject_id, "alice@example.com");

        let map = adapter.map_attributes(verified.raw_attributes);
        assert_eq!(
            map.get_default(DefaultAttribute::LastName).and_then(|v| v.first()),
            Some("Doe")
        );
        assert_eq!(map.get_raw("urn:corp/department").and_then(|v| v.first()), Some("R&D"));
    }

    #[tokio::test]
    async fn wrong_context_is_unverified() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;
        let message = response(&state, wresult(REALM, true, 600)).with_param("wctx", "other");

        let result = adapter.complete(&message, &state).await;
        assert_eq!(result.reject_reason(), Some(RejectReason::Unverified));
    }

    #[tokio::test]
    async fn other_reply_endpoint_is_recipient_mismatch() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;
        let mut message = response(&state, wresult(REALM, true, 600));
        message.receiving_url = "https://rp.example.com/elsewhere".into();

        let result = adapter.complete(&message, &state).await;
        assert_eq!(result.reject_reason(), Some(RejectReason::RecipientMismatch));
    }

    #[tokio::test]
    async fn unsigned_token_is_rejected() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, false, 600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::SignatureInvalid));
    }

    #[tokio::test]
    async fn token_for_other_realm_is_audience_mismatch() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult("urn:someone-else", true, 600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::AudienceMismatch));
    }

    #[tokio::test]
    async fn expired_token() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, true, -3600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::Expired));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let adapter = adapter();
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, "<not-a-token/>".into()), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::Malformed));

        let result = adapter
            .complete(&InboundMessage::new(REPLY).with_param("wa", "wsignout1.0"), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::Malformed));
    }

    #[tokio::test]
    async fn token_service_timeout_is_expired() {
        let adapter = adapter().with_token_service(Arc::new(FixedService(Err(TransportError::Timeout))));
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, false, 600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::Expired));
    }

    #[tokio::test]
    async fn token_service_fault_is_signature_invalid() {
        let adapter = adapter().with_token_service(Arc::new(FixedService(Err(
            TransportError::Fault("ID3082: bad token".into()),
        ))));
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, true, 600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::SignatureInvalid));
    }

    #[tokio::test]
    async fn token_service_verdict_replaces_signature_requirement() {
        let valid = TokenValidation {
            code: STATUS_VALID.to_string(),
            reason: None,
        };
        let adapter = adapter().with_token_service(Arc::new(FixedService(Ok(valid))));
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, false, 600)), &state)
            .await;
        assert!(result.is_verified());
    }

    #[tokio::test]
    async fn token_service_rejection_is_signature_invalid() {
        let invalid = TokenValidation {
            code: "http://docs.oasis-open.org/ws-sx/ws-trust/200512/status/invalid".to_string(),
            reason: Some("revoked".into()),
        };
        let adapter = adapter().with_token_service(Arc::new(FixedService(Ok(invalid))));
        let state = adapter.initiate(&TargetDescriptor::new()).unwrap().state;

        let result = adapter
            .complete(&response(&state, wresult(REALM, true, 600)), &state)
            .await;
        assert_eq!(result.reject_reason(), Some(RejectReason::SignatureInvalid));
    }

    #[test]
    fn claim_convention() {
        assert_eq!(
            adapter().find_attribute_uri(DefaultAttribute::FirstName),
            Some("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname")
        );
    }
}
