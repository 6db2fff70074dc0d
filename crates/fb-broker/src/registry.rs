//! Registry of configured protocol adapters.

use std::sync::Arc;

use dashmap::DashMap;
use fb_protocol::{ProtocolAdapter, ProtocolDescriptor};
use parking_lot::RwLock;

use crate::adapter::Adapter;
use crate::error::{BrokerError, BrokerResult};

/// Adapters keyed by protocol id.
///
/// Filled once at startup and only read afterwards.
#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    adapters: DashMap<&'static str, Arc<Adapter>>,
    default: RwLock<Option<&'static str>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its protocol id.
    ///
    /// Fails if an adapter for the same protocol is already registered.
    pub fn register(&self, adapter: Adapter) -> BrokerResult<()> {
        let id = adapter.identify();
        match self.adapters.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(BrokerError::Configuration(format!(
                "protocol {id} is registered twice"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(adapter));
                tracing::debug!(protocol = id, "registered protocol adapter");
                Ok(())
            }
        }
    }

    /// Sets the protocol used when the caller does not name one.
    pub fn set_default(&self, protocol_id: &str) -> BrokerResult<()> {
        let id = self
            .adapters
            .get(protocol_id)
            .map(|entry| *entry.key())
            .ok_or_else(|| BrokerError::UnknownProtocol(protocol_id.to_string()))?;
        *self.default.write() = Some(id);
        Ok(())
    }

    /// Returns the default protocol id.
    ///
    /// With a single registered adapter, that adapter is the default.
    #[must_use]
    pub fn default_protocol(&self) -> Option<&'static str> {
        if let Some(id) = *self.default.read() {
            return Some(id);
        }
        if self.adapters.len() == 1 {
            return self.adapters.iter().next().map(|entry| *entry.key());
        }
        None
    }

    /// Returns the adapter for a protocol id.
    #[must_use]
    pub fn get(&self, protocol_id: &str) -> Option<Arc<Adapter>> {
        self.adapters.get(protocol_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the adapter for the requested protocol, or the default one.
    pub fn resolve(&self, protocol_id: Option<&str>) -> BrokerResult<Arc<Adapter>> {
        let id = match protocol_id {
            Some(id) => id,
            None => self.default_protocol().ok_or_else(|| {
                BrokerError::InvalidRequest(
                    "no protocol requested and no default protocol configured".into(),
                )
            })?,
        };
        self.get(id)
            .ok_or_else(|| BrokerError::UnknownProtocol(id.to_string()))
    }

    /// Returns the descriptors of all registered adapters, ordered by id.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ProtocolDescriptor> {
        let mut descriptors: Vec<_> = self
            .adapters
            .iter()
            .map(|entry| entry.value().descriptor())
            .collect();
        descriptors.sort_by_key(|d| d.id);
        descriptors
    }

    /// Lists registered protocol ids, ordered.
    #[must_use]
    pub fn list_protocols(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.adapters.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Checks if a protocol is registered.
    #[must_use]
    pub fn has_protocol(&self, protocol_id: &str) -> bool {
        self.adapters.contains_key(protocol_id)
    }

    /// Checks that every listed protocol is registered.
    pub fn validate_required(&self, required: &[&str]) -> BrokerResult<()> {
        let missing: Vec<_> = required
            .iter()
            .filter(|id| !self.has_protocol(id))
            .copied()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BrokerError::Configuration(format!(
                "required protocols not registered: {}",
                missing.join(", ")
            )))
        }
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns whether no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
