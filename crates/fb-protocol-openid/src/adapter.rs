//! OpenID 2.0 protocol adapter.
//!
//! ## NIST 800-53 Rev5: IA-2 (Identification and Authentication)
//!
//! A positive assertion is accepted only when its `return_to` is the URL
//! recorded at initiation and carries that initiation's nonce, it was signed
//! with the association the request named, and its response nonce is recent
//! and has not been accepted before.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use fb_core::{AttributeMap, AttributeMapping, AttributeUriTable, DefaultAttribute, RawAttributes};
use fb_protocol::endpoint::{append_query, resolve_endpoint};
use fb_protocol::{
    protocol_id, Capability, InboundMessage, Initiation, OutboundInstruction, ProtocolAdapter,
    ProtocolDescriptor, ProtocolError, ProtocolResult, RejectReason, TargetDescriptor,
    ValidationResult,
};
use fb_session::ExchangeState;
use tracing::{debug, warn};

use crate::association::Association;
use crate::ax::{FetchRequest, FetchResponse};
use crate::config::OpenIdConfig;
use crate::error::OpenIdError;
use crate::message::{nonce_timestamp, ParameterList, IDENTIFIER_SELECT, NS_OPENID_2, NS_UI};
use crate::replay::NonceCache;

/// Extension key recording the provider endpoint the request was sent to.
const EXT_OP_ENDPOINT: &str = "op_endpoint";

/// Extension key recording the association handle the request named.
const EXT_ASSOC_HANDLE: &str = "assoc_handle";

/// `return_to` query parameter carrying the per-request nonce.
pub const RETURN_TO_NONCE: &str = "rp_nonce";

/// OpenID Authentication 2.0 relying party adapter.
pub struct OpenIdAdapter {
    config: OpenIdConfig,
    association: Association,
    mapping: AttributeMapping,
    nonces: NonceCache,
}

impl OpenIdAdapter {
    /// Creates the adapter.
    pub fn new(config: OpenIdConfig, attributes: &AttributeUriTable) -> ProtocolResult<Self> {
        config.validate().map_err(ProtocolError::Configuration)?;
        let association = config.association.build()?;
        let nonces = NonceCache::new(max_nonce_age(&config));

        Ok(Self {
            nonces,
            mapping: AttributeMapping::new(protocol_id::OPENID, attributes, axschema_uri),
            association,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &OpenIdConfig {
        &self.config
    }

    fn fetch_request(&self) -> FetchRequest {
        self.config
            .requested_attributes
            .iter()
            .fold(FetchRequest::new(), |request, wanted| {
                request.with_attribute(
                    wanted.attribute.as_str(),
                    self.mapping.uri_for(wanted.attribute),
                    wanted.required,
                )
            })
    }

    fn validate(&self, inbound: &InboundMessage, expected: &ExchangeState) -> ValidationResult {
        match inbound.param("openid.mode") {
            Some("id_res") => {}
            mode => {
                debug!(mode = mode.unwrap_or("-"), "no positive assertion");
                return RejectReason::Unverified.into();
            }
        }

        let params = ParameterList::from_request(&inbound.parameters);
        if let Err(e) = check_required(&params) {
            warn!(error = %e, "malformed OpenID response");
            return e.reject_reason().into();
        }

        let return_to = params.get("return_to").unwrap_or_default();
        let (Some((address, nonce)), Some((expected_address, _))) =
            (split_return_to(return_to), split_return_to(&expected.recipient))
        else {
            debug!(return_to, "unusable return_to");
            return RejectReason::RecipientMismatch.into();
        };
        if address != expected_address {
            debug!(return_to, recipient = %expected.recipient, "return_to mismatch");
            return RejectReason::RecipientMismatch.into();
        }
        if !inbound.receiving_url.is_empty() && !return_to_matches(&inbound.receiving_url, return_to)
        {
            debug!(received_on = %inbound.receiving_url, return_to, "response delivered to another URL");
            return RejectReason::RecipientMismatch.into();
        }

        if nonce.as_deref() != Some(expected.exchange_id.as_str()) {
            debug!("assertion answers another request");
            return RejectReason::Unverified.into();
        }

        let handle = expected
            .extension(EXT_ASSOC_HANDLE)
            .unwrap_or_else(|| self.association.handle());
        if params.get("assoc_handle") != Some(handle) {
            debug!("assertion signed under another association");
            return RejectReason::Unverified.into();
        }
        if let Some(handle) = params.get("invalidate_handle") {
            warn!(handle, "provider invalidated the association");
            return RejectReason::Unverified.into();
        }
        if expected
            .extension(EXT_OP_ENDPOINT)
            .is_some_and(|ep| params.get("op_endpoint") != Some(ep))
        {
            debug!(op_endpoint = ?params.get("op_endpoint"), "assertion from another provider");
            return RejectReason::Unverified.into();
        }

        if let Err(e) = self.association.verify(&params) {
            warn!(error = %e, "OpenID signature rejected");
            return RejectReason::SignatureInvalid.into();
        }

        let response_nonce = params.get("response_nonce").unwrap_or_default();
        let issued = match nonce_timestamp(response_nonce) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "unreadable response nonce");
                return RejectReason::Malformed.into();
            }
        };
        let max_age = max_nonce_age(&self.config);
        let now = Utc::now();
        if now - issued > max_age || issued - now > max_age {
            debug!(issued = %issued, "response nonce outside the accepted window");
            return RejectReason::Expired.into();
        }
        let op_endpoint = params.get("op_endpoint").unwrap_or_default();
        if !self.nonces.record(op_endpoint, response_nonce, issued) {
            warn!(op_endpoint, response_nonce, "response nonce already used");
            return RejectReason::Unverified.into();
        }

        let Some(claimed_id) = params.get("claimed_id").filter(|c| !c.is_empty()) else {
            debug!("assertion carries no claimed identifier");
            return RejectReason::Unverified.into();
        };

        match FetchResponse::parse(&params.signed_only()) {
            Ok(fetch) => ValidationResult::verified(
                claimed_id,
                fetch.map(FetchResponse::into_raw_attributes).unwrap_or_default(),
            ),
            Err(e) => {
                warn!(error = %e, "malformed attribute exchange response");
                e.reject_reason().into()
            }
        }
    }
}

fn check_required(params: &ParameterList) -> Result<(), OpenIdError> {
    match params.get("ns") {
        Some(NS_OPENID_2) => {}
        other => return Err(OpenIdError::Namespace(other.unwrap_or("-").to_string())),
    }
    for field in [
        "op_endpoint",
        "return_to",
        "response_nonce",
        "assoc_handle",
        "signed",
        "sig",
    ] {
        params.require(field)?;
    }
    Ok(())
}

fn max_nonce_age(config: &OpenIdConfig) -> chrono::Duration {
    chrono::Duration::from_std(config.max_nonce_age()).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Splits `return_to` into the address without the request nonce and the
/// nonce itself.
fn split_return_to(return_to: &str) -> Option<(String, Option<String>)> {
    let mut url = url::Url::parse(return_to).ok()?;
    let mut nonce = None;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == RETURN_TO_NONCE {
                nonce = Some(v.into_owned());
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    url.set_query(None);
    if !kept.is_empty() {
        url.query_pairs_mut().extend_pairs(kept);
    }
    Some((url.into(), nonce))
}

/// Checks a receiving URL against `return_to`: same scheme, host, port and
/// path, and every `return_to` query parameter present with the same value.
fn return_to_matches(receiving_url: &str, return_to: &str) -> bool {
    let (Ok(received), Ok(expected)) = (url::Url::parse(receiving_url), url::Url::parse(return_to))
    else {
        return false;
    };

    if received.scheme() != expected.scheme()
        || received.host_str() != expected.host_str()
        || received.port_or_known_default() != expected.port_or_known_default()
        || received.path() != expected.path()
    {
        return false;
    }

    let received: BTreeMap<_, _> = received.query_pairs().collect();
    expected
        .query_pairs()
        .all(|(k, v)| received.get(&k) == Some(&v))
}

/// axschema.org type URIs.
fn axschema_uri(attribute: DefaultAttribute) -> Option<&'static str> {
    match attribute {
        DefaultAttribute::LastName => Some("http://axschema.org/namePerson/last"),
        DefaultAttribute::FirstName => Some("http://axschema.org/namePerson/first"),
        DefaultAttribute::Name => Some("http://axschema.org/namePerson"),
        DefaultAttribute::Address => Some("http://axschema.org/contact/postalAddress/home"),
        DefaultAttribute::Locality => Some("http://axschema.org/contact/city/home"),
        DefaultAttribute::PostalCode => Some("http://axschema.org/contact/postalCode/home"),
        DefaultAttribute::Gender => Some("http://axschema.org/person/gender"),
        DefaultAttribute::DateOfBirth => Some("http://axschema.org/birthDate"),
        DefaultAttribute::Photo => Some("http://axschema.org/media/image/default"),
        DefaultAttribute::Identifier
        | DefaultAttribute::PlaceOfBirth
        | DefaultAttribute::Nationality => None,
    }
}

#[async_trait]
impl ProtocolAdapter for OpenIdAdapter {
    fn identify(&self) -> &'static str {
        protocol_id::OPENID
    }

    fn descriptor(&self) -> ProtocolDescriptor {
        ProtocolDescriptor::new(protocol_id::OPENID, "OpenID 2.0")
            .with_capability(Capability::AttributeRequest)
    }

    fn find_attribute_uri(&self, attribute: DefaultAttribute) -> Option<&'static str> {
        axschema_uri(attribute)
    }

    fn initiate(&self, target: &TargetDescriptor) -> ProtocolResult<Initiation> {
        let address = resolve_endpoint(
            self.config.return_to.as_deref(),
            self.config.return_path.as_deref(),
            target.origin.as_deref(),
            "return_to",
        )?;
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let return_to = append_query(&address, &[(RETURN_TO_NONCE, &nonce)]);
        let realm = match &self.config.realm {
            Some(realm) => realm.clone(),
            None => url::Url::parse(&address)
                .and_then(|u| u.join("/"))
                .map(String::from)
                .map_err(|e| ProtocolError::Configuration(format!("openid: bad return_to: {e}")))?,
        };

        let claimed_id = self.config.claimed_id.as_deref().unwrap_or(IDENTIFIER_SELECT);
        let identity = self.config.op_local_id.as_deref().unwrap_or(claimed_id);

        let mut params = ParameterList::new()
            .with("ns", NS_OPENID_2)
            .with("mode", "checkid_setup")
            .with("claimed_id", claimed_id)
            .with("identity", identity)
            .with("assoc_handle", self.association.handle())
            .with("return_to", return_to.clone())
            .with("realm", realm);
        self.fetch_request().apply(&mut params);
        if let Some(lang) = &target.language {
            params.set("ns.ui", NS_UI);
            params.set("ui.lang", lang.clone());
        }

        let pairs = params.to_query_pairs();
        let query: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let url = append_query(&self.config.op_endpoint, &query);

        debug!(op_endpoint = %self.config.op_endpoint, return_to = %return_to, "built checkid_setup request");

        let state = ExchangeState::new(protocol_id::OPENID, nonce, return_to)
            .with_relay_state(target.relay_state.clone())
            .with_extension(EXT_ASSOC_HANDLE, self.association.handle())
            .with_extension(EXT_OP_ENDPOINT, self.config.op_endpoint.clone());

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
        self.validate(inbound, expected)
    }

    fn map_attributes(&self, raw: RawAttributes) -> AttributeMap {
        self.mapping.to_attribute_map(raw)
    }
}
