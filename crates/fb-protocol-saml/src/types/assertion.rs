//! SAML assertions.
//!
//! Parses SAML 2.0 assertions from Web SSO responses and SAML 1.1 assertions
//! carried in WS-Federation token responses into one shape.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fb_core::RawAttributes;

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// SAML assertion version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlVersion {
    /// SAML 1.1.
    V1_1,
    /// SAML 2.0.
    V2_0,
}

/// Bearer subject confirmation data (SAML 2.0 only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: Option<String>,
    /// Endpoint the assertion may be delivered to.
    pub recipient: Option<String>,
    /// Request the assertion answers.
    pub in_response_to: Option<String>,
    /// Latest delivery time.
    pub not_on_or_after: Option<DateTime<Utc>>,
}

/// A parsed SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlAssertion {
    /// Assertion version.
    pub version: SamlVersion,
    /// Assertion ID (`ID` or `AssertionID`).
    pub id: String,
    /// Issuer.
    pub issuer: Option<String>,
    /// Issue instant.
    pub issue_instant: Option<DateTime<Utc>>,
    /// Whether the assertion carries an enveloped signature.
    pub signed: bool,
    /// Subject identifier (`NameID` or `NameIdentifier`).
    pub subject: Option<String>,
    /// Subject confirmation data.
    pub confirmation: Option<SubjectConfirmation>,
    /// Conditions `NotBefore`.
    pub not_before: Option<DateTime<Utc>>,
    /// Conditions `NotOnOrAfter`.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Audience restrictions.
    pub audiences: Vec<String>,
    /// Attribute statement values.
    pub attributes: RawAttributes,
}

impl SamlAssertion {
    /// Parses an assertion document.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        Self::from_element(&XmlElement::parse(xml)?)
    }

    /// Reads an assertion from its element.
    pub fn from_element(element: &XmlElement) -> SamlResult<Self> {
        if element.name != "Assertion" {
            return Err(SamlError::MissingElement("Assertion".to_string()));
        }

        if element.attr("MajorVersion") == Some("1") {
            Self::from_v1(element)
        } else if element.attr("Version") == Some("2.0") {
            Self::from_v2(element)
        } else {
            Err(SamlError::InvalidResponse(
                "unsupported assertion version".to_string(),
            ))
        }
    }

    fn from_v2(element: &XmlElement) -> SamlResult<Self> {
        let id = required_attr(element, "ID")?;
        let subject = element.child("Subject");
        let conditions = element.child("Conditions");

        let confirmation = subject
            .and_then(|s| s.child("SubjectConfirmation"))
            .map(|sc| -> SamlResult<SubjectConfirmation> {
                let data = sc.child("SubjectConfirmationData");
                Ok(SubjectConfirmation {
                    method: sc.attr("Method").map(String::from),
                    recipient: data.and_then(|d| d.attr("Recipient")).map(String::from),
                    in_response_to: data.and_then(|d| d.attr("InResponseTo")).map(String::from),
                    not_on_or_after: optional_instant(data, "NotOnOrAfter")?,
                })
            })
            .transpose()?;

        let mut attributes = RawAttributes::new();
        for statement in element.children_named("AttributeStatement") {
            for attribute in statement.children_named("Attribute") {
                let name = required_attr(attribute, "Name")?;
                attributes.push(name, attribute_values(attribute));
            }
        }

        Ok(Self {
            version: SamlVersion::V2_0,
            id,
            issuer: element
                .child("Issuer")
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            issue_instant: optional_instant(Some(element), "IssueInstant")?,
            signed: element.child("Signature").is_some(),
            subject: subject
                .and_then(|s| s.child("NameID"))
                .and_then(XmlElement::non_empty_text)
                .map(String::from),
            confirmation,
            not_before: optional_instant(conditions, "NotBefore")?,
            not_on_or_after: optional_instant(conditions, "NotOnOrAfter")?,
            audiences: audiences(conditions, "AudienceRestriction"),
            attributes,
        })
    }

    fn from_v1(element: &XmlElement) -> SamlResult<Self> {
        let id = required_attr(element, "AssertionID")?;
        let conditions = element.child("Conditions");

        let subject = element
            .find("NameIdentifier")
            .and_then(XmlElement::non_empty_text)
            .map(String::from);

        let mut attributes = RawAttributes::new();
        for statement in element.children_named("AttributeStatement") {
            for attribute in statement.children_named("Attribute") {
                let name = required_attr(attribute, "AttributeName")?;
                let identifier = match attribute.attr("AttributeNamespace") {
                    Some(ns) if !ns.is_empty() => format!("{}/{name}", ns.trim_end_matches('/')),
                    _ => name,
                };
                attributes.push(identifier, attribute_values(attribute));
            }
        }

        Ok(Self {
            version: SamlVersion::V1_1,
            id,
            issuer: element.attr("Issuer").map(String::from),
            issue_instant: optional_instant(Some(element), "IssueInstant")?,
            signed: element.child("Signature").is_some(),
            subject,
            confirmation: None,
            not_before: optional_instant(conditions, "NotBefore")?,
            not_on_or_after: optional_instant(conditions, "NotOnOrAfter")?,
            audiences: audiences(conditions, "AudienceRestrictionCondition"),
            attributes,
        })
    }

    /// Checks the Conditions and subject confirmation validity window,
    /// allowing `skew` of clock difference in either direction.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero());

        if self.not_before.is_some_and(|nb| now + skew < nb) {
            return false;
        }
        if self.not_on_or_after.is_some_and(|noa| now - skew >= noa) {
            return false;
        }
        if self
            .confirmation
            .as_ref()
            .and_then(|c| c.not_on_or_after)
            .is_some_and(|noa| now - skew >= noa)
        {
            return false;
        }
        true
    }

    /// Checks that an audience restriction names `audience`.
    ///
    /// An assertion without audience restriction is not accepted.
    #[must_use]
    pub fn has_audience(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a == audience)
    }
}

fn required_attr(element: &XmlElement, name: &str) -> SamlResult<String> {
    element
        .attr(name)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| SamlError::MissingElement(format!("{}@{name}", element.name)))
}

/// Parses an optional xs:dateTime attribute.
pub(crate) fn optional_instant(
    element: Option<&XmlElement>,
    name: &str,
) -> SamlResult<Option<DateTime<Utc>>> {
    element
        .and_then(|e| e.attr(name))
        .map(parse_instant)
        .transpose()
}

/// Parses an xs:dateTime value.
pub(crate) fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::InvalidTimestamp(format!("{value}: {e}")))
}

fn audiences(conditions: Option<&XmlElement>, restriction: &str) -> Vec<String> {
    conditions
        .map(|c| {
            c.children_named(restriction)
                .flat_map(|r| r.children_named("Audience"))
                .filter_map(XmlElement::non_empty_text)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn attribute_values(attribute: &XmlElement) -> Vec<String> {
    attribute
        .children_named("AttributeValue")
        .map(|v| v.text().to_string())
        .collect()
}
