//! SAML 2.0 adapter for the federation broker.
//!
//! This crate provides the service-provider side of SAML 2.0 Web Browser SSO:
//!
//! - **AuthnRequest construction** - Build requests bound to the exchange
//! - **POST and Redirect bindings** - Deliver requests through either binding
//! - **Response and assertion parsing** - SAML 2.0 and SAML 1.1 assertions
//! - **Correlated validation** - `InResponseTo`, recipient, signature,
//!   audience and validity window checks
//!
//! # Architecture
//!
//! - [`types`] - AuthnRequest, Response and Assertion types
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`xml`] - Minimal element tree over `quick-xml`
//! - [`adapter`] - The [`Saml2Adapter`] protocol adapter
//! - [`config`] - Adapter configuration
//! - [`error`] - Error types for SAML operations
//!
//! XML signatures are verified and created through the
//! [`fb_protocol::SignatureVerifier`] and [`fb_protocol::RequestSigner`]
//! seams; this crate holds no key material.
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod bindings;
pub mod config;
pub mod error;
pub mod types;
pub mod xml;

pub use adapter::Saml2Adapter;
pub use config::{SamlBinding, SamlConfig};
pub use error::{SamlError, SamlResult};
pub use types::*;
