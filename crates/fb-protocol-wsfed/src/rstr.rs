//! RequestSecurityTokenResponse parsing.
//!
//! The `wresult` of a sign-in response is a WS-Trust
//! `RequestSecurityTokenResponse`, possibly wrapped in a
//! `RequestSecurityTokenResponseCollection`, carrying one SAML 1.1 or SAML
//! 2.0 assertion.

use chrono::{DateTime, Utc};
use fb_protocol_saml::xml::XmlElement;
use fb_protocol_saml::SamlAssertion;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{WsFedError, WsFedResult};

/// A parsed token response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSecurityTokenResponse {
    /// `wsp:AppliesTo` endpoint address.
    pub applies_to: Option<String>,
    /// `Lifetime/Created`.
    pub created: Option<DateTime<Utc>>,
    /// `Lifetime/Expires`.
    pub expires: Option<DateTime<Utc>>,
    /// `TokenType`.
    pub token_type: Option<String>,
    /// The issued assertion.
    pub assertion: SamlAssertion,
    /// The assertion as received, for token service validation.
    pub token_xml: String,
}

impl RequestSecurityTokenResponse {
    /// Parses a `wresult` document.
    pub fn parse(wresult: &str) -> WsFedResult<Self> {
        let root = XmlElement::parse(wresult)?;

        let rstr = match root.name.as_str() {
            "RequestSecurityTokenResponse" => &root,
            "RequestSecurityTokenResponseCollection" => {
                root.child("RequestSecurityTokenResponse").ok_or_else(|| {
                    WsFedError::InvalidResponse("empty token response collection".into())
                })?
            }
            other => {
                return Err(WsFedError::InvalidResponse(format!(
                    "unexpected root element {other}"
                )))
            }
        };

        let token = rstr
            .child("RequestedSecurityToken")
            .ok_or_else(|| WsFedError::InvalidResponse("no RequestedSecurityToken".into()))?;
        let assertion = token
            .child("Assertion")
            .ok_or_else(|| WsFedError::InvalidResponse("token is not a SAML assertion".into()))?;

        let lifetime = rstr.child("Lifetime");
        let instant = |name: &str| -> WsFedResult<Option<DateTime<Utc>>> {
            lifetime
                .and_then(|l| l.child(name))
                .and_then(XmlElement::non_empty_text)
                .map(|t| {
                    DateTime::parse_from_rfc3339(t)
                        .map(|d| d.with_timezone(&Utc))
                        .map_err(|e| WsFedError::InvalidResponse(format!("Lifetime/{name}: {e}")))
                })
                .transpose()
        };

        Ok(Self {
            applies_to: rstr
                .find("AppliesTo")
                .and_then(|a| a.find("Address"))
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            created: instant("Created")?,
            expires: instant("Expires")?,
            token_type: rstr
                .child("TokenType")
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            assertion: SamlAssertion::from_element(assertion)?,
            token_xml: inner_xml(wresult, "RequestedSecurityToken")?,
        })
    }

    /// Checks the response lifetime against `now`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>, skew: std::time::Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero());
        if self.created.is_some_and(|c| now + skew < c) {
            return false;
        }
        !self.expires.is_some_and(|e| now - skew >= e)
    }
}

/// Returns the raw content of the first element with the given local name.
fn inner_xml(document: &str, local_name: &str) -> WsFedResult<String> {
    let mut reader = Reader::from_str(document);
    let mut start = None;
    let mut depth = 0usize;

    loop {
        let before = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                if start.is_none() {
                    start = Some(reader.buffer_position());
                }
                depth += 1;
            }
            Event::End(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                depth = depth.saturating_sub(1);
                if let (Some(from), 0) = (start, depth) {
                    let from = usize::try_from(from)
                        .map_err(|e| WsFedError::InvalidResponse(e.to_string()))?;
                    let to = usize::try_from(before)
                        .map_err(|e| WsFedError::InvalidResponse(e.to_string()))?;
                    return document
                        .get(from..to)
                        .map(|s| s.trim().to_string())
                        .ok_or_else(|| WsFedError::InvalidResponse("bad token offsets".into()));
                }
            }
            Event::Eof => {
                return Err(WsFedError::InvalidResponse(format!("no {local_name} element")))
            }
            _ => {}
        }
    }
}
