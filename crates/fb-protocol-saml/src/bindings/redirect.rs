//! HTTP-Redirect binding.
//!
//! The AuthnRequest travels deflated and base64-encoded in the query string.
//! A signed redirect carries a detached signature over the query string.

use base64::Engine;
use fb_protocol::{OutboundInstruction, RequestSigner};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{SamlError, SamlResult};

use super::SamlMessageType;

/// Builds redirect URLs carrying an AuthnRequest.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Builds an unsigned redirect to `destination`.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<OutboundInstruction> {
        let query = Self::query(xml, relay_state, SamlMessageType::Request)?;
        Ok(OutboundInstruction::Redirect {
            url: join(destination, &query),
        })
    }

    /// Builds a redirect with a detached query signature.
    ///
    /// The signature covers `SAMLRequest`, `RelayState` (if present) and
    /// `SigAlg`, in that order, as URL-encoded in the final query.
    pub fn encode_signed_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        signer: &dyn RequestSigner,
    ) -> SamlResult<OutboundInstruction> {
        let mut query = Self::query(xml, relay_state, SamlMessageType::Request)?;
        query.push_str(&format!("&SigAlg={}", urlencoding::encode(signer.algorithm())));

        let signature = signer
            .sign_query(&query)
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        query.push_str(&format!("&Signature={}", urlencoding::encode(&signature.value)));

        Ok(OutboundInstruction::Redirect {
            url: join(destination, &query),
        })
    }

    fn query(
        xml: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let compressed = deflate(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);

        let mut query = format!(
            "{}={}",
            message_type.form_param(),
            urlencoding::encode(&encoded)
        );
        if let Some(rs) = relay_state {
            query.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        Ok(query)
    }

    /// Decodes a deflated, base64-encoded message parameter into XML.
    ///
    /// The value must already be URL-decoded.
    pub fn decode(value: &str) -> SamlResult<String> {
        let deflated = base64::engine::general_purpose::STANDARD.decode(value)?;
        String::from_utf8(inflate(&deflated)?)
            .map_err(|e| SamlError::XmlParse(format!("message is not UTF-8: {e}")))
    }
}

fn join(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

/// Raw DEFLATE, no zlib header.
fn deflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut xml = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut xml)?;
    Ok(xml)
}
