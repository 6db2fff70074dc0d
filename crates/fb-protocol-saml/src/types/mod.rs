//! SAML message types.

mod assertion;
mod authn_request;
pub mod constants;
mod response;

pub use assertion::{SamlAssertion, SamlVersion, SubjectConfirmation};
pub use authn_request::{AuthnRequest, NameIdPolicy};
pub use response::SamlResponse;
