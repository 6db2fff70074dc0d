//! Correlation store trait.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionResult;
use crate::exchange::ExchangeState;

/// Key of one correlation slot: the caller's session and a protocol id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    /// Opaque per-user session supplied by the web layer.
    pub session_id: String,
    /// Protocol id of the exchange.
    pub protocol_id: String,
}

impl CorrelationKey {
    /// Creates a key.
    #[must_use]
    pub fn new(session_id: impl Into<String>, protocol_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            protocol_id: protocol_id.into(),
        }
    }

    /// Returns the key as a single storage string.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("exchange:{}:{}", self.protocol_id, self.session_id)
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.protocol_id)
    }
}

/// Result of storing correlation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The slot was empty.
    Stored,
    /// A live exchange for the same slot was overwritten.
    Replaced,
}

/// Storage for in-flight exchange state.
///
/// Implementations may use in-process maps or a distributed store. A
/// distributed implementation must make [`take_and_clear`] atomic across
/// nodes, so that concurrent duplicate delivery of one response completes at
/// most once.
///
/// [`take_and_clear`]: CorrelationStore::take_and_clear
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Stores state for a slot, replacing any live state for that slot.
    async fn put(&self, key: &CorrelationKey, state: ExchangeState) -> SessionResult<PutOutcome>;

    /// Atomically reads and deletes the state for a slot.
    ///
    /// Returns `None` when no state exists, including on any call after a
    /// successful take.
    async fn take_and_clear(&self, key: &CorrelationKey) -> SessionResult<Option<ExchangeState>>;

    /// Removes state older than `max_age`. Returns the number removed.
    ///
    /// Stores with native expiry may return 0.
    async fn purge_expired(&self, max_age: Duration) -> SessionResult<usize>;
}
