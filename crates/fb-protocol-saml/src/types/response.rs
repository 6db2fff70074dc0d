//! SAML Response.

use chrono::{DateTime, Utc};

use super::assertion::{optional_instant, SamlAssertion};
use super::constants::STATUS_SUCCESS;
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// A parsed SAML 2.0 `samlp:Response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlResponse {
    /// Response ID.
    pub id: String,
    /// ID of the request this response answers.
    pub in_response_to: Option<String>,
    /// Endpoint the response was sent to.
    pub destination: Option<String>,
    /// Issuer.
    pub issuer: Option<String>,
    /// Issue instant.
    pub issue_instant: Option<DateTime<Utc>>,
    /// Top-level status code.
    pub status_code: String,
    /// Status message, if any.
    pub status_message: Option<String>,
    /// Whether the response itself carries an enveloped signature.
    pub signed: bool,
    /// Plain assertions.
    pub assertions: Vec<SamlAssertion>,
    /// Whether encrypted assertions are present.
    pub has_encrypted_assertion: bool,
}

impl SamlResponse {
    /// Parses a response document.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = XmlElement::parse(xml)?;
        if root.name != "Response" {
            return Err(SamlError::InvalidResponse(format!(
                "expected Response, found {}",
                root.name
            )));
        }

        let id = root
            .attr("ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SamlError::MissingElement("Response@ID".to_string()))?
            .to_string();

        let status = root
            .path(&["Status", "StatusCode"])
            .and_then(|s| s.attr("Value"))
            .ok_or_else(|| SamlError::MissingElement("Status/StatusCode".to_string()))?
            .to_string();

        let assertions = root
            .children_named("Assertion")
            .map(SamlAssertion::from_element)
            .collect::<SamlResult<Vec<_>>>()?;
        // Only one assertion may be consumed, and it must be the one verified.
        if assertions.len() > 1 {
            return Err(SamlError::InvalidResponse(format!(
                "{} assertions in one response",
                assertions.len()
            )));
        }

        Ok(Self {
            id,
            in_response_to: root.attr("InResponseTo").map(String::from),
            destination: root.attr("Destination").map(String::from),
            issuer: root
                .child("Issuer")
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            issue_instant: optional_instant(Some(&root), "IssueInstant")?,
            status_code: status,
            status_message: root
                .path(&["Status", "StatusMessage"])
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            signed: root.child("Signature").is_some(),
            assertions,
            has_encrypted_assertion: root.child("EncryptedAssertion").is_some(),
        })
    }

    /// Checks if the top-level status is Success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS
    }

    /// Returns the assertion, if the response carries one.
    #[must_use]
    pub fn assertion(&self) -> Option<&SamlAssertion> {
        self.assertions.first()
    }
}
