//! Association signatures.
//!
//! ## NIST 800-53 Rev5: SC-13 (Cryptographic Protection)
//!
//! Positive assertions are authenticated with an HMAC keyed by the shared
//! association secret. The tag is compared in constant time by `aws-lc-rs`.

use aws_lc_rs::hmac;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{OpenIdError, OpenIdResult};
use crate::message::ParameterList;

/// Fields `openid.signed` must always cover.
const REQUIRED_SIGNED: [&str; 4] = ["op_endpoint", "return_to", "response_nonce", "assoc_handle"];

/// Association MAC algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssocType {
    /// HMAC-SHA1.
    #[serde(rename = "HMAC-SHA1")]
    HmacSha1,
    /// HMAC-SHA256.
    #[default]
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl AssocType {
    /// Returns the protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// Returns the MAC key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
        }
    }

    fn algorithm(self) -> hmac::Algorithm {
        match self {
            Self::HmacSha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::HmacSha256 => hmac::HMAC_SHA256,
        }
    }
}

/// A shared-secret association with an OpenID provider.
pub struct Association {
    handle: String,
    assoc_type: AssocType,
    key: hmac::Key,
}

impl std::fmt::Debug for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("handle", &self.handle)
            .field("assoc_type", &self.assoc_type)
            .finish_non_exhaustive()
    }
}

impl Association {
    /// Creates an association from a base64-encoded MAC key.
    pub fn new(
        handle: impl Into<String>,
        assoc_type: AssocType,
        mac_key_b64: &str,
    ) -> OpenIdResult<Self> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(mac_key_b64.trim())
            .map_err(|e| OpenIdError::Association(format!("mac_key is not base64: {e}")))?;

        if secret.len() != assoc_type.key_len() {
            return Err(OpenIdError::Association(format!(
                "{} requires a {}-byte mac_key, got {}",
                assoc_type.as_str(),
                assoc_type.key_len(),
                secret.len()
            )));
        }

        let handle = handle.into();
        if handle.is_empty() {
            return Err(OpenIdError::Association("empty association handle".into()));
        }

        Ok(Self {
            handle,
            assoc_type,
            key: hmac::Key::new(assoc_type.algorithm(), &secret),
        })
    }

    /// Returns the association handle.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Returns the MAC algorithm.
    #[must_use]
    pub const fn assoc_type(&self) -> AssocType {
        self.assoc_type
    }

    /// Computes `openid.sig` over the fields listed in `openid.signed`.
    pub fn sign(&self, params: &ParameterList) -> OpenIdResult<String> {
        let base = params.key_value_form(&params.signed_fields())?;
        let tag = hmac::sign(&self.key, base.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(tag.as_ref()))
    }

    /// Verifies `openid.sig` of a positive assertion.
    pub fn verify(&self, params: &ParameterList) -> OpenIdResult<()> {
        let signed = params.signed_fields();

        for field in REQUIRED_SIGNED {
            if !signed.contains(&field) {
                return Err(OpenIdError::Signature(format!("{field} is not signed")));
            }
        }
        for field in ["claimed_id", "identity"] {
            if params.contains(field) && !signed.contains(&field) {
                return Err(OpenIdError::Signature(format!("{field} is not signed")));
            }
        }

        let sig = base64::engine::general_purpose::STANDARD
            .decode(params.require("sig")?)
            .map_err(|e| OpenIdError::Signature(format!("openid.sig is not base64: {e}")))?;
        let base = params.key_value_form(&signed)?;

        hmac::verify(&self.key, base.as_bytes(), &sig)
            .map_err(|_| OpenIdError::Signature("HMAC mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_256: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn assertion() -> ParameterList {
        ParameterList::new()
            .with("mode", "id_res")
            .with("op_endpoint", "https://op.example.com/server")
            .with("return_to", "https://rp.example.com/return")
            .with("response_nonce", "2026-01-01T00:00:00Zabc")
            .with("assoc_handle", "h1")
            .with("claimed_id", "https://op.example.com/id/alice")
            .with("identity", "https://op.example.com/id/alice")
            .with(
                "signed",
                "op_endpoint,return_to,response_nonce,assoc_handle,claimed_id,identity",
            )
    }

    fn signed(association: &Association) -> ParameterList {
        let mut params = assertion();
        let sig = association.sign(&params).unwrap();
        params.set("sig", sig);
        params
    }

    #[test]
    fn verifies_own_signature() {
        let association = Association::new("h1", AssocType::HmacSha256, KEY_256).unwrap();
        assert!(association.verify(&signed(&association)).is_ok());
    }

    #[test]
    fn detects_tampering() {
        let association = Association::new("h1", AssocType::HmacSha256, KEY_256).unwrap();
        let mut params = signed(&association);
        params.set("claimed_id", "https://op.example.com/id/mallory");

        assert!(matches!(
            association.verify(&params),
            Err(OpenIdError::Signature(_))
        ));
    }

    #[test]
    fn claimed_id_must_be_signed() {
        let association = Association::new("h1", AssocType::HmacSha256, KEY_256).unwrap();
        let mut params = assertion().with(
            "signed",
            "op_endpoint,return_to,response_nonce,assoc_handle",
        );
        let sig = association.sign(&params).unwrap();
        params.set("sig", sig);

        assert!(matches!(
            association.verify(&params),
            Err(OpenIdError::Signature(_))
        ));
    }

    #[test]
    fn sha1_association() {
        let key = base64::engine::general_purpose::STANDARD.encode([7u8; 20]);
        let association = Association::new("h1", AssocType::HmacSha1, &key).unwrap();
        assert!(association.verify(&signed(&association)).is_ok());
    }

    #[test]
    fn key_length_must_match_type() {
        assert!(matches!(
            Association::new("h1", AssocType::HmacSha1, KEY_256),
            Err(OpenIdError::Association(_))
        ));
        assert!(Association::new("h1", AssocType::HmacSha256, "%%").is_err());
        assert!(Association::new("", AssocType::HmacSha256, KEY_256).is_err());
    }
}
