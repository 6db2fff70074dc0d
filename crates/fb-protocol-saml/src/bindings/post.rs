//! HTTP-POST binding.

use base64::Engine;
use fb_protocol::OutboundInstruction;

use crate::error::{SamlError, SamlResult};

use super::SamlMessageType;

/// Builds auto-post forms and reads posted SAML messages.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Wraps an AuthnRequest in an auto-submitting form for `destination`.
    #[must_use]
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> OutboundInstruction {
        Self::encode(xml, destination, relay_state, SamlMessageType::Request)
    }

    fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> OutboundInstruction {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);

        let mut fields = vec![(message_type.form_param().to_string(), encoded)];
        if let Some(rs) = relay_state {
            fields.push(("RelayState".to_string(), rs.to_string()));
        }

        OutboundInstruction::AutoPostForm {
            url: destination.to_string(),
            fields,
        }
    }

    /// Decodes the `SAMLResponse` form field into XML.
    pub fn decode_response(saml_response: &str) -> SamlResult<String> {
        // Some identity providers wrap the base64 at 76 columns.
        let compact: String = saml_response.split_whitespace().collect();

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SamlError::Base64Decode(e.to_string()))?;

        String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidResponse(format!("Invalid UTF-8 in message: {e}")))
    }
}
