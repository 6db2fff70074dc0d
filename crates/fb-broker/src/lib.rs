//! # fb-broker
//!
//! The protocol-neutral entry point of the federation broker.
//!
//! A [`Dispatcher`] owns the configured protocol adapters and the correlation
//! store. The calling application asks it to start an exchange for a session
//! and, when the identity provider answers, to complete it. The application
//! never sees protocol-specific types: it gets an [`OutboundInstruction`]
//! to send and an [`Outcome`] to act on.
//!
//! # Architecture
//!
//! - [`adapter`] - The closed set of protocol adapters
//! - [`registry`] - Adapters keyed by protocol id, plus the default protocol
//! - [`config`] - The immutable configuration snapshot
//! - [`dispatcher`] - `initiate` / `complete` orchestration
//! - [`outcome`] - The uniform result handed to the caller
//! - [`error`] - Error types
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and authentication through federated providers
//! - SC-23: Single-use correlation state per session and protocol
//! - AU-2: One audit event per initiation and completion
//!
//! [`OutboundInstruction`]: fb_protocol::OutboundInstruction

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod registry;

pub use adapter::Adapter;
pub use config::{BrokerConfig, BrokerSection, TraceConfig};
pub use dispatcher::Dispatcher;
pub use error::{BrokerError, BrokerResult};
pub use outcome::Outcome;
pub use registry::ProtocolRegistry;
