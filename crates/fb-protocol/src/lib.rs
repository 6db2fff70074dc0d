//! # fb-protocol
//!
//! The contract every protocol adapter implements.
//!
//! An adapter turns a [`TargetDescriptor`] into an [`OutboundInstruction`]
//! plus the correlation state needed to check the response, and later turns
//! an [`InboundMessage`] into a [`ValidationResult`]. Validation failure is an
//! expected outcome: `complete` never returns an error.
//!
//! # Architecture
//!
//! - [`adapter`] - The [`ProtocolAdapter`] trait and its input/output types
//! - [`descriptor`] - Static per-adapter metadata
//! - [`instruction`] - Redirect and auto-post transport shapes
//! - [`crypto`] - Seams to the certificate/identity provider
//! - [`endpoint`] - Return-address reconstruction and query helpers
//! - [`error`] - Initiation errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod crypto;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod instruction;

pub use adapter::{
    InboundMessage, Initiation, ProtocolAdapter, RejectReason, TargetDescriptor, ValidationResult,
    Verified,
};
pub use crypto::{QuerySignature, RequestSigner, SignatureVerifier, SigningError, VerificationError};
pub use descriptor::{protocol_id, Capability, ProtocolDescriptor};
pub use error::{ProtocolError, ProtocolResult};
pub use instruction::OutboundInstruction;
