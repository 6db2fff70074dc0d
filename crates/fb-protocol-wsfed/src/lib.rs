//! WS-Federation adapter for the federation broker.
//!
//! Relying-party side of the WS-Federation passive requestor profile:
//!
//! - **Sign-in requests** - `wa=wsignin1.0` redirects to the security token service
//! - **Token responses** - `wresult` RequestSecurityTokenResponse parsing with
//!   SAML 1.1 and SAML 2.0 tokens
//! - **Token service validation** - Optional WS-Trust 1.3 `Validate` call
//! - **Diagnostic tracing** - Observational hook on token service traffic
//!
//! # Architecture
//!
//! - [`adapter`] - The [`WsFedAdapter`] protocol adapter
//! - [`request`] - Sign-in request construction
//! - [`rstr`] - RequestSecurityTokenResponse parsing
//! - [`sts`] - Security token service client
//! - [`trace`] - Diagnostic trace hook
//! - [`config`] - Adapter configuration
//! - [`error`] - Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod request;
pub mod rstr;
pub mod sts;
pub mod trace;

pub use adapter::WsFedAdapter;
pub use config::{TokenServiceConfig, WsFedConfig};
pub use error::{WsFedError, WsFedResult};
pub use request::SignInRequest;
pub use rstr::RequestSecurityTokenResponse;
pub use sts::{HttpSecurityTokenService, SecurityTokenService, TokenValidation, TransportError};
pub use trace::{Direction, LoggingTraceHook, NoopTraceHook, TraceError, TraceHook};
