//! OpenID Authentication 2.0 adapter for the federation broker.
//!
//! Relying-party side of OpenID 2.0 with the Attribute Exchange 1.0 fetch
//! extension:
//!
//! - **checkid_setup requests** - Indirect requests through a browser redirect
//! - **Attribute Exchange** - Fetch requests and responses
//! - **Association signatures** - HMAC-SHA1 and HMAC-SHA256 over the signed
//!   fields of a positive assertion
//! - **Correlated validation** - a per-request nonce in `return_to`, the
//!   association handle, and response nonces that are recent and unused
//!
//! The association with the OpenID provider is established out of band and
//! handed to the adapter through configuration.
//!
//! # Architecture
//!
//! - [`adapter`] - The [`OpenIdAdapter`] protocol adapter
//! - [`association`] - Shared-secret signature verification
//! - [`ax`] - Attribute Exchange fetch request/response
//! - [`message`] - `openid.*` parameter lists and key-value form
//! - [`replay`] - Response nonces already accepted
//! - [`config`] - Adapter configuration
//! - [`error`] - Error types
//!
//! # Specifications
//!
//! - [OpenID Authentication 2.0](https://openid.net/specs/openid-authentication-2_0.html)
//! - [OpenID Attribute Exchange 1.0](https://openid.net/specs/openid-attribute-exchange-1_0.html)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod association;
pub mod ax;
pub mod config;
pub mod error;
pub mod message;
pub mod replay;

pub use adapter::OpenIdAdapter;
pub use association::{AssocType, Association};
pub use ax::{FetchRequest, FetchResponse};
pub use config::{AssociationConfig, OpenIdConfig, RequestedAttribute};
pub use error::{OpenIdError, OpenIdResult};
pub use message::ParameterList;
pub use replay::NonceCache;
