//! OpenID adapter configuration.

use std::time::Duration;

use fb_core::DefaultAttribute;
use serde::{Deserialize, Serialize};

use crate::association::{AssocType, Association};
use crate::error::OpenIdResult;

/// Association established with the OpenID provider out of band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Association handle.
    pub handle: String,
    /// Base64-encoded MAC key.
    pub mac_key: String,
    /// MAC algorithm.
    #[serde(default)]
    pub assoc_type: AssocType,
}

impl AssociationConfig {
    /// Builds the association.
    pub fn build(&self) -> OpenIdResult<Association> {
        Association::new(&self.handle, self.assoc_type, &self.mac_key)
    }
}

/// An attribute requested through Attribute Exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    /// The attribute.
    pub attribute: DefaultAttribute,
    /// Whether the provider is asked to treat it as required.
    #[serde(default)]
    pub required: bool,
}

/// OpenID 2.0 relying party settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenIdConfig {
    /// OpenID provider endpoint URL.
    pub op_endpoint: String,

    /// Claimed identifier. Defaults to identifier select.
    pub claimed_id: Option<String>,

    /// OP-local identifier. Defaults to the claimed identifier.
    pub op_local_id: Option<String>,

    /// Shared association.
    pub association: AssociationConfig,

    /// Realm. Defaults to the root of the return URL.
    pub realm: Option<String>,

    /// Absolute return URL.
    pub return_to: Option<String>,

    /// Return path, joined to the request origin when `return_to` is unset.
    pub return_path: Option<String>,

    /// Attributes requested through Attribute Exchange.
    #[serde(default = "default_requested_attributes")]
    pub requested_attributes: Vec<RequestedAttribute>,

    /// Maximum age of `openid.response_nonce`, in seconds.
    #[serde(default = "default_max_nonce_age")]
    pub max_nonce_age_secs: u64,
}

impl OpenIdConfig {
    /// Creates a configuration with an absolute return URL.
    #[must_use]
    pub fn new(
        op_endpoint: impl Into<String>,
        return_to: impl Into<String>,
        association: AssociationConfig,
    ) -> Self {
        Self {
            op_endpoint: op_endpoint.into(),
            claimed_id: None,
            op_local_id: None,
            association,
            realm: None,
            return_to: Some(return_to.into()),
            return_path: None,
            requested_attributes: default_requested_attributes(),
            max_nonce_age_secs: default_max_nonce_age(),
        }
    }

    /// Returns the maximum nonce age.
    #[must_use]
    pub const fn max_nonce_age(&self) -> Duration {
        Duration::from_secs(self.max_nonce_age_secs)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.op_endpoint)
            .map_err(|e| format!("openid: invalid op_endpoint: {e}"))?;

        match (&self.return_to, &self.return_path) {
            (None, None) => return Err("openid: return_to or return_path is required".into()),
            (Some(url), _) => {
                url::Url::parse(url).map_err(|e| format!("openid: invalid return_to: {e}"))?;
            }
            (None, Some(_)) => {}
        }

        if let Some(realm) = &self.realm {
            url::Url::parse(realm).map_err(|e| format!("openid: invalid realm: {e}"))?;
        }

        if self.max_nonce_age_secs == 0 {
            return Err("openid: max_nonce_age_secs must be positive".into());
        }

        self.association
            .build()
            .map(|_| ())
            .map_err(|e| format!("openid: {e}"))
    }
}

fn default_requested_attributes() -> Vec<RequestedAttribute> {
    [
        (DefaultAttribute::FirstName, true),
        (DefaultAttribute::LastName, true),
        (DefaultAttribute::Name, false),
    ]
    .into_iter()
    .map(|(attribute, required)| RequestedAttribute {
        attribute,
        required,
    })
    .collect()
}

const fn default_max_nonce_age() -> u64 {
    300
}
