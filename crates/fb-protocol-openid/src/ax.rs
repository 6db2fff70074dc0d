//! Attribute Exchange 1.0 fetch messages.

use fb_core::RawAttributes;

use crate::error::{OpenIdError, OpenIdResult};
use crate::message::ParameterList;

/// Attribute Exchange 1.0 namespace.
pub const NS_AX: &str = "http://openid.net/srv/ax/1.0";

/// Alias used for the extension in outgoing requests.
const REQUEST_ALIAS: &str = "ax";

/// One requested attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchAttribute {
    alias: String,
    type_uri: String,
    required: bool,
}

/// An AX `fetch_request`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    attributes: Vec<FetchAttribute>,
}

impl FetchRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an attribute under `alias`.
    #[must_use]
    pub fn with_attribute(
        mut self,
        alias: impl Into<String>,
        type_uri: impl Into<String>,
        required: bool,
    ) -> Self {
        self.attributes.push(FetchAttribute {
            alias: alias.into(),
            type_uri: type_uri.into(),
            required,
        });
        self
    }

    /// Returns whether no attribute is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Writes the extension parameters into `params`.
    pub fn apply(&self, params: &mut ParameterList) {
        if self.is_empty() {
            return;
        }

        params.set(format!("ns.{REQUEST_ALIAS}"), NS_AX);
        params.set(format!("{REQUEST_ALIAS}.mode"), "fetch_request");

        for attribute in &self.attributes {
            params.set(
                format!("{REQUEST_ALIAS}.type.{}", attribute.alias),
                attribute.type_uri.clone(),
            );
        }

        let (required, optional): (Vec<_>, Vec<_>) =
            self.attributes.iter().partition(|a| a.required);
        let join = |list: &[&FetchAttribute]| {
            list.iter()
                .map(|a| a.alias.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        if !required.is_empty() {
            params.set(format!("{REQUEST_ALIAS}.required"), join(&required));
        }
        if !optional.is_empty() {
            params.set(format!("{REQUEST_ALIAS}.if_available"), join(&optional));
        }
    }
}

/// An AX `fetch_response`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    values: Vec<(String, Vec<String>)>,
}

impl FetchResponse {
    /// Extracts the fetch response from a message.
    ///
    /// The extension may use any alias bound to [`NS_AX`]. Returns `None`
    /// when the message carries no AX extension.
    pub fn parse(params: &ParameterList) -> OpenIdResult<Option<Self>> {
        let Some(alias) = params
            .iter()
            .find(|(k, v)| k.starts_with("ns.") && *v == NS_AX)
            .map(|(k, _)| k["ns.".len()..].to_string())
        else {
            return Ok(None);
        };

        match params.get(&format!("{alias}.mode")) {
            Some("fetch_response") => {}
            Some(other) => {
                return Err(OpenIdError::invalid(
                    format!("openid.{alias}.mode"),
                    format!("unexpected AX mode {other}"),
                ))
            }
            None => return Ok(None),
        }

        let type_prefix = format!("{alias}.type.");
        let mut values = Vec::new();

        for (key, type_uri) in params.iter() {
            let Some(attr_alias) = key.strip_prefix(&type_prefix) else {
                continue;
            };
            values.push((
                type_uri.to_string(),
                Self::values_for(params, &alias, attr_alias)?,
            ));
        }

        Ok(Some(Self { values }))
    }

    fn values_for(params: &ParameterList, alias: &str, attr: &str) -> OpenIdResult<Vec<String>> {
        let count_key = format!("{alias}.count.{attr}");
        let Some(count) = params.get(&count_key) else {
            return Ok(params
                .get(&format!("{alias}.value.{attr}"))
                .filter(|v| !v.is_empty())
                .map(|v| vec![v.to_string()])
                .unwrap_or_default());
        };

        let count: usize = count
            .parse()
            .map_err(|_| OpenIdError::invalid(format!("openid.{count_key}"), "not a number"))?;

        (1..=count)
            .map(|n| {
                let key = format!("{alias}.value.{attr}.{n}");
                params
                    .get(&key)
                    .map(String::from)
                    .ok_or_else(|| OpenIdError::MissingParameter(format!("openid.{key}")))
            })
            .collect()
    }

    /// Returns the values for a type URI.
    #[must_use]
    pub fn values(&self, type_uri: &str) -> Option<&[String]> {
        self.values
            .iter()
            .find(|(uri, _)| uri == type_uri)
            .map(|(_, v)| v.as_slice())
    }

    /// Converts into raw attributes keyed by type URI.
    #[must_use]
    pub fn into_raw_attributes(self) -> RawAttributes {
        let mut raw = RawAttributes::new();
        for (uri, values) in self.values {
            if !values.is_empty() {
                raw.push(uri, values);
            }
        }
        raw
    }
}
