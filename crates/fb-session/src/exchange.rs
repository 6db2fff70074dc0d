//! Correlation record for one in-flight authentication exchange.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correlation state for one in-flight authentication attempt.
///
/// Created when the broker sends an authentication request and consumed
/// when the response arrives. The `exchange_id` and `recipient` are the
/// anchors the protocol adapter validates the response against.
///
/// ## Flow
///
/// 1. Adapter builds the request → `ExchangeState` created
/// 2. Broker stores it under (session, protocol)
/// 3. Response arrives → state taken and deleted, response validated against it
/// 4. A replayed response finds no state and fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeState {
    /// Opaque protocol-specific correlation token (SAML request ID, OpenID
    /// association handle, WS-Federation context value).
    pub exchange_id: String,
    /// Endpoint the response must be delivered to.
    pub recipient: String,
    /// Caller-supplied value round-tripped through the exchange.
    pub relay_state: Option<String>,
    /// Protocol that produced this state.
    pub protocol_id: String,
    /// When the request was built.
    pub created_at: DateTime<Utc>,
    /// Additional per-protocol correlation fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl ExchangeState {
    /// Creates a new exchange state stamped with the current time.
    #[must_use]
    pub fn new(
        protocol_id: impl Into<String>,
        exchange_id: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            recipient: recipient.into(),
            relay_state: None,
            protocol_id: protocol_id.into(),
            created_at: Utc::now(),
            extensions: BTreeMap::new(),
        }
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: Option<String>) -> Self {
        self.relay_state = relay_state;
        self
    }

    /// Adds a per-protocol correlation field.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Overrides the creation time.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns a per-protocol correlation field.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    /// Returns how long ago the request was built.
    #[must_use]
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }

    /// Checks if the state is older than `max_age`.
    #[must_use]
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}
