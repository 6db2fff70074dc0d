//! Generic attribute model.
//!
//! Every protocol delivers identity facts under its own naming convention:
//! SAML attribute names, OpenID Attribute Exchange type URIs, WS-Federation
//! claim types. This module defines the protocol-neutral [`DefaultAttribute`]
//! set, the configuration-loaded URI table that maps it onto each protocol,
//! and the conversion from raw protocol attributes into an [`AttributeMap`].
//!
//! Unrecognized raw attributes are preserved under their raw identifier.
//! The broker never drops a claim the relying application might still want.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Claim type namespace used for the default attribute URIs.
const CLAIMS_NS: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims";

/// Protocol-neutral identity facts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAttribute {
    /// Surname.
    LastName,
    /// Given name.
    FirstName,
    /// Full display name.
    Name,
    /// Stable unique identifier of the subject.
    Identifier,
    /// Street address.
    Address,
    /// City or municipality.
    Locality,
    /// Postal code.
    PostalCode,
    /// Gender.
    Gender,
    /// Date of birth.
    DateOfBirth,
    /// Place of birth.
    PlaceOfBirth,
    /// Nationality.
    Nationality,
    /// Photo (base64 encoded image).
    Photo,
}

impl DefaultAttribute {
    /// All default attributes, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::LastName,
        Self::FirstName,
        Self::Name,
        Self::Identifier,
        Self::Address,
        Self::Locality,
        Self::PostalCode,
        Self::Gender,
        Self::DateOfBirth,
        Self::PlaceOfBirth,
        Self::Nationality,
        Self::Photo,
    ];

    /// Returns the configuration name of this attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastName => "last_name",
            Self::FirstName => "first_name",
            Self::Name => "name",
            Self::Identifier => "identifier",
            Self::Address => "address",
            Self::Locality => "locality",
            Self::PostalCode => "postal_code",
            Self::Gender => "gender",
            Self::DateOfBirth => "date_of_birth",
            Self::PlaceOfBirth => "place_of_birth",
            Self::Nationality => "nationality",
            Self::Photo => "photo",
        }
    }

    /// Returns the URI used when neither configuration nor the protocol
    /// supplies one.
    #[must_use]
    pub const fn default_uri(self) -> &'static str {
        match self {
            Self::LastName => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
            Self::FirstName => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
            Self::Name => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
            Self::Identifier => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/privatepersonalidentifier"
            }
            Self::Address => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/streetaddress"
            }
            Self::Locality => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/locality",
            Self::PostalCode => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/postalcode",
            Self::Gender => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/gender",
            Self::DateOfBirth => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/dateofbirth"
            }
            Self::PlaceOfBirth => "urn:federation-broker:attribute:place-of-birth",
            Self::Nationality => "urn:federation-broker:attribute:nationality",
            Self::Photo => "urn:federation-broker:attribute:photo",
        }
    }

    /// Returns whether the default URI lives in the WS-Federation claim
    /// type namespace.
    #[must_use]
    pub fn is_standard_claim(self) -> bool {
        self.default_uri().starts_with(CLAIMS_NS)
    }
}

impl fmt::Display for DefaultAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefaultAttribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown default attribute: {s}")))
    }
}

/// A default attribute with an optional protocol-specific URI override.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    default_attribute: DefaultAttribute,
    uri: Option<String>,
}

impl Attribute {
    /// Creates an attribute without a URI override.
    #[must_use]
    pub const fn new(default_attribute: DefaultAttribute) -> Self {
        Self {
            default_attribute,
            uri: None,
        }
    }

    /// Creates an attribute with a URI override.
    #[must_use]
    pub fn with_uri(default_attribute: DefaultAttribute, uri: impl Into<String>) -> Self {
        Self {
            default_attribute,
            uri: Some(uri.into()),
        }
    }

    /// Returns the protocol-neutral attribute.
    #[must_use]
    pub const fn default_attribute(&self) -> DefaultAttribute {
        self.default_attribute
    }

    /// Returns the URI override, if any.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns the override, falling back to the default URI.
    #[must_use]
    pub fn effective_uri(&self) -> &str {
        self.uri
            .as_deref()
            .unwrap_or_else(|| self.default_attribute.default_uri())
    }
}

/// Configured default-attribute to URI table, keyed by protocol id.
///
/// Loaded once from configuration and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeUriTable {
    protocols: BTreeMap<String, BTreeMap<DefaultAttribute, String>>,
}

impl AttributeUriTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URI override for a protocol.
    #[must_use]
    pub fn with_uri(
        mut self,
        protocol_id: impl Into<String>,
        attribute: DefaultAttribute,
        uri: impl Into<String>,
    ) -> Self {
        self.protocols
            .entry(protocol_id.into())
            .or_default()
            .insert(attribute, uri.into());
        self
    }

    /// Returns the configured URI for an attribute under a protocol.
    ///
    /// `None` means "use the protocol's own default convention".
    #[must_use]
    pub fn resolve_uri(&self, protocol_id: &str, attribute: DefaultAttribute) -> Option<&str> {
        self.protocols
            .get(protocol_id)
            .and_then(|entries| entries.get(&attribute))
            .map(String::as_str)
    }

    /// Returns the configured attributes for a protocol.
    #[must_use]
    pub fn attributes(&self, protocol_id: &str) -> Vec<Attribute> {
        self.protocols
            .get(protocol_id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(attr, uri)| Attribute::with_uri(*attr, uri.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the protocol ids that carry overrides.
    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    /// Checks that no protocol maps two attributes onto the same URI.
    pub fn validate(&self) -> Result<(), Error> {
        for (protocol, entries) in &self.protocols {
            let mut seen: HashMap<&str, DefaultAttribute> = HashMap::new();
            for (attr, uri) in entries {
                if uri.trim().is_empty() {
                    return Err(Error::Configuration(format!(
                        "empty URI for {attr} under protocol {protocol}"
                    )));
                }
                if let Some(previous) = seen.insert(uri.as_str(), *attr) {
                    return Err(Error::Configuration(format!(
                        "protocol {protocol} maps both {previous} and {attr} to {uri}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Key of an [`AttributeMap`] entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKey {
    /// A raw attribute recognized as a default attribute.
    Default(DefaultAttribute),
    /// An unrecognized raw attribute, under its protocol identifier.
    Raw(String),
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(attr) => write!(f, "{attr}"),
            Self::Raw(name) => f.write_str(name),
        }
    }
}

/// Attribute value: scalar or multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Single value.
    Single(String),
    /// Multiple values, in delivery order.
    Multi(Vec<String>),
}

impl AttributeValue {
    /// Builds a value from a protocol value list.
    #[must_use]
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Single(values.remove(0))
        } else {
            Self::Multi(values)
        }
    }

    /// Returns all values as a slice.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values,
        }
    }

    /// Returns the first value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    /// Appends the values of `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let mut values = match self {
            Self::Single(value) => vec![value],
            Self::Multi(values) => values,
        };
        match other {
            Self::Single(value) => values.push(value),
            Self::Multi(more) => values.extend(more),
        }
        Self::Multi(values)
    }
}

/// Attributes as delivered by a protocol, in delivery order.
///
/// Identifiers are protocol-specific (SAML attribute names, AX type URIs,
/// claim types). The same identifier may occur more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttributes {
    entries: Vec<(String, Vec<String>)>,
}

impl RawAttributes {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute.
    pub fn push(&mut self, identifier: impl Into<String>, values: Vec<String>) {
        self.entries.push((identifier.into(), values));
    }

    /// Appends an attribute, builder style.
    #[must_use]
    pub fn with(mut self, identifier: impl Into<String>, values: Vec<String>) -> Self {
        self.push(identifier, values);
        self
    }

    /// Returns the values delivered under an identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(name, _)| name == identifier)
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct identifiers.
    #[must_use]
    pub fn distinct_len(&self) -> usize {
        let mut names: Vec<&str> = self.entries.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    /// Returns whether no attribute was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RawAttributes {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Generic attribute map handed to the caller in a successful outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: BTreeMap<AttributeKey, AttributeValue>,
}

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, merging with any value already under the key.
    pub fn insert(&mut self, key: AttributeKey, value: AttributeValue) {
        let merged = match self.entries.remove(&key) {
            Some(existing) => existing.merge(value),
            None => value,
        };
        self.entries.insert(key, merged);
    }

    /// Returns the value under a key.
    #[must_use]
    pub fn get(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    /// Returns the value of a default attribute.
    #[must_use]
    pub fn get_default(&self, attribute: DefaultAttribute) -> Option<&AttributeValue> {
        self.entries.get(&AttributeKey::Default(attribute))
    }

    /// Returns the value of an unmapped raw attribute.
    #[must_use]
    pub fn get_raw(&self, identifier: &str) -> Option<&AttributeValue> {
        self.entries.get(&AttributeKey::Raw(identifier.to_string()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &AttributeValue)> {
        self.entries.iter()
    }
}

impl IntoIterator for AttributeMap {
    type Item = (AttributeKey, AttributeValue);
    type IntoIter = std::collections::btree_map::IntoIter<AttributeKey, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Per-adapter conversion from raw protocol attributes to an [`AttributeMap`].
///
/// URI precedence for each default attribute: the configured table entry,
/// then the adapter's own convention, then [`DefaultAttribute::default_uri`].
/// The convention and default URIs are also recognized on input when the
/// configured URI differs from them.
#[derive(Debug, Clone)]
pub struct AttributeMapping {
    protocol_id: String,
    resolved: BTreeMap<DefaultAttribute, String>,
    reverse: HashMap<String, DefaultAttribute>,
}

impl AttributeMapping {
    /// Builds the mapping for a protocol.
    pub fn new<F>(protocol_id: &str, table: &AttributeUriTable, convention: F) -> Self
    where
        F: Fn(DefaultAttribute) -> Option<&'static str>,
    {
        let mut resolved = BTreeMap::new();
        let mut reverse = HashMap::new();

        for attr in DefaultAttribute::ALL {
            let uri = table
                .resolve_uri(protocol_id, attr)
                .or_else(|| convention(attr))
                .unwrap_or_else(|| attr.default_uri());
            reverse.insert(uri.to_string(), attr);
            resolved.insert(attr, uri.to_string());
        }

        // Aliases never displace a resolved URI.
        for attr in DefaultAttribute::ALL {
            for alias in [convention(attr), Some(attr.default_uri())].into_iter().flatten() {
                reverse.entry(alias.to_string()).or_insert(attr);
            }
        }

        Self {
            protocol_id: protocol_id.to_string(),
            resolved,
            reverse,
        }
    }

    /// Returns the protocol this mapping belongs to.
    #[must_use]
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Returns the URI to request for an attribute.
    #[must_use]
    pub fn uri_for(&self, attribute: DefaultAttribute) -> &str {
        self.resolved
            .get(&attribute)
            .map_or_else(|| attribute.default_uri(), String::as_str)
    }

    /// Returns the default attribute a raw identifier maps to.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<DefaultAttribute> {
        self.reverse.get(identifier).copied()
    }

    /// Converts raw protocol attributes into the generic map.
    ///
    /// Mapped identifiers are renamed; unmapped identifiers pass through
    /// under [`AttributeKey::Raw`]. Values of a repeated identifier are merged.
    /// When two different identifiers map to the same default attribute, the
    /// first one delivered takes the default key and the other keeps its raw
    /// identifier, so the number of distinct keys never shrinks.
    #[must_use]
    pub fn to_attribute_map(&self, raw: RawAttributes) -> AttributeMap {
        let mut map = AttributeMap::new();
        let mut claimed: HashMap<DefaultAttribute, String> = HashMap::new();

        for (identifier, values) in raw {
            let key = match self.lookup(&identifier) {
                Some(attr) => match claimed.get(&attr) {
                    Some(owner) if owner != &identifier => AttributeKey::Raw(identifier),
                    Some(_) => AttributeKey::Default(attr),
                    None => {
                        claimed.insert(attr, identifier);
                        AttributeKey::Default(attr)
                    }
                },
                None => AttributeKey::Raw(identifier),
            };
            map.insert(key, AttributeValue::from_values(values));
        }

        map
    }
}
