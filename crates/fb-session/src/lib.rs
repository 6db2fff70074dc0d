//! # fb-session
//!
//! Per-exchange correlation state for the federation broker.
//!
//! An [`ExchangeState`] is written when an authentication request is sent and
//! consumed exactly once when the response arrives. The store is keyed by the
//! caller's session and the protocol id, so each session holds at most one
//! live exchange per protocol.
//!
//! ## NIST 800-53 Rev5: SC-23 (Session Authenticity)
//!
//! [`CorrelationStore::take_and_clear`] is an atomic read-then-delete. A
//! captured response cannot be replayed because its correlation state is
//! gone after the first completion.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod exchange;
pub mod memory;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use exchange::ExchangeState;
pub use memory::InMemoryCorrelationStore;
pub use store::{CorrelationKey, CorrelationStore, PutOutcome};
