//! OpenID indirect message parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{OpenIdError, OpenIdResult};

/// OpenID Authentication 2.0 namespace.
pub const NS_OPENID_2: &str = "http://specs.openid.net/auth/2.0";

/// Identifier used when the OpenID provider selects the identity.
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// User interface extension namespace.
pub const NS_UI: &str = "http://specs.openid.net/extensions/ui/1.0";

const PREFIX: &str = "openid.";

/// The `openid.*` parameters of one indirect message.
///
/// Keys are stored without the `openid.` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterList {
    params: BTreeMap<String, String>,
}

impl ParameterList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the `openid.*` entries of a request parameter map.
    pub fn from_request<'a, I>(parameters: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let params = parameters
            .into_iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(PREFIX)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect();
        Self { params }
    }

    /// Sets a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Sets a parameter, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns a parameter by its name without the `openid.` prefix.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns a parameter or [`OpenIdError::MissingParameter`].
    pub fn require(&self, key: &str) -> OpenIdResult<&str> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OpenIdError::MissingParameter(format!("{PREFIX}{key}")))
    }

    /// Returns whether a parameter is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterates over `(key, value)` pairs, keys without prefix.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the field names listed in `openid.signed`.
    #[must_use]
    pub fn signed_fields(&self) -> Vec<&str> {
        self.get("signed")
            .map(|s| s.split(',').filter(|f| !f.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Returns only the parameters covered by `openid.signed`.
    #[must_use]
    pub fn signed_only(&self) -> Self {
        let fields = self.signed_fields();
        let params = self
            .params
            .iter()
            .filter(|(k, _)| fields.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { params }
    }

    /// Encodes the given fields in key-value form, in order.
    ///
    /// This is the signature base string of a positive assertion.
    pub fn key_value_form(&self, fields: &[&str]) -> OpenIdResult<String> {
        let mut out = String::new();
        for field in fields {
            let value = self
                .get(field)
                .ok_or_else(|| OpenIdError::MissingParameter(format!("{PREFIX}{field}")))?;
            if field.contains([':', '\n']) || value.contains('\n') {
                return Err(OpenIdError::invalid(
                    format!("{PREFIX}{field}"),
                    "not representable in key-value form",
                ));
            }
            out.push_str(field);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        Ok(out)
    }

    /// Returns the parameters as `openid.`-prefixed query pairs.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (format!("{PREFIX}{k}"), v.clone()))
            .collect()
    }
}

/// Parses the timestamp prefix of an `openid.response_nonce`.
///
/// The nonce starts with a UTC timestamp such as `2005-05-15T17:11:51Z`
/// followed by optional unique characters.
pub fn nonce_timestamp(nonce: &str) -> OpenIdResult<DateTime<Utc>> {
    let end = nonce
        .find('Z')
        .ok_or_else(|| OpenIdError::invalid("openid.response_nonce", "no timestamp"))?;

    DateTime::parse_from_rfc3339(&nonce[..=end])
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| OpenIdError::invalid("openid.response_nonce", e.to_string()))
}
