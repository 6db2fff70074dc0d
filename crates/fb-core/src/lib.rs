//! # fb-core
//!
//! Protocol-neutral building blocks for the federation broker.
//!
//! This crate provides the generic attribute model shared by every protocol
//! adapter, the error taxonomy used across the workspace, and the audit
//! events emitted for each authentication exchange.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AU-2: Exchange event logging
//! - SI-11: Error handling

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attribute;
pub mod error;
pub mod event;

pub use attribute::{
    Attribute, AttributeKey, AttributeMap, AttributeMapping, AttributeUriTable, AttributeValue,
    DefaultAttribute, RawAttributes,
};
pub use error::{Error, ErrorCategory, Result};
pub use event::{EventOutcome, EventType, ExchangeEvent, ExchangeEventBuilder, ExchangeStatus};
