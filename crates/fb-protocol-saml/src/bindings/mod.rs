//! SAML bindings.
//!
//! - **HTTP-POST Binding** - Messages are base64-encoded and sent in an
//!   auto-submitting HTML form
//! - **HTTP-Redirect Binding** - Messages are deflated, base64-encoded, and
//!   URL-encoded into the query string
//!
//! Encoders return an [`fb_protocol::OutboundInstruction`]; the caller layer
//! issues it.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}
