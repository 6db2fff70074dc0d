//! Seams to the certificate/identity provider.
//!
//! Adapters never touch key material. Signature verification of inbound
//! assertions and signing of outbound requests are delegated to
//! implementations supplied by the hosting application.

use thiserror::Error;

/// Why a signature was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The referenced element carries no signature.
    #[error("no signature over element {0}")]
    Missing(String),

    /// The signature does not verify.
    #[error("signature invalid: {0}")]
    Invalid(String),

    /// The signing key is not trusted for this issuer.
    #[error("untrusted signing key: {0}")]
    UntrustedKey(String),
}

/// Failure to produce a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SigningError(pub String);

/// A detached signature over a redirect query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySignature {
    /// Signature algorithm URI.
    pub algorithm: String,
    /// Base64-encoded signature value.
    pub value: String,
}

/// Verifies enveloped XML signatures.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature over the element with ID `reference_id` in
    /// `document`, signed on behalf of `issuer`.
    fn verify(&self, document: &str, reference_id: &str, issuer: &str)
        -> Result<(), VerificationError>;
}

/// Signs outbound requests.
pub trait RequestSigner: Send + Sync {
    /// Returns an enveloped-signed copy of `document`, signing the element
    /// with ID `reference_id`.
    fn sign_xml(&self, document: &str, reference_id: &str) -> Result<String, SigningError>;

    /// Signs a redirect binding query string.
    ///
    /// `query` already contains the `SigAlg` parameter for
    /// [`RequestSigner::algorithm`].
    fn sign_query(&self, query: &str) -> Result<QuerySignature, SigningError>;

    /// Returns the signature algorithm URI used by this signer.
    fn algorithm(&self) -> &str;
}
