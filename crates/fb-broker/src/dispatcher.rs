//! Exchange orchestration.
//!
//! ## NIST 800-53 Rev5: SC-23 (Session Authenticity)
//!
//! Correlation state is stored only once a complete outbound instruction
//! exists, and is taken out of the store before the response is examined.
//! A response can therefore complete at most once.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! Every initiation and completion emits an [`ExchangeEvent`].

use std::sync::Arc;
use std::time::Duration;

use fb_core::{EventType, ExchangeEvent};
use fb_protocol::{
    InboundMessage, Initiation, OutboundInstruction, ProtocolAdapter, RejectReason,
    RequestSigner, SignatureVerifier, TargetDescriptor, ValidationResult,
};
use fb_protocol_openid::OpenIdAdapter;
use fb_protocol_saml::Saml2Adapter;
use fb_protocol_wsfed::{LoggingTraceHook, TraceHook, WsFedAdapter};
use fb_session::{CorrelationKey, CorrelationStore, PutOutcome};

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::outcome::Outcome;
use crate::registry::ProtocolRegistry;

/// Starts and completes authentication exchanges.
///
/// Shared across concurrent requests; holds no per-exchange state of its own.
pub struct Dispatcher {
    registry: ProtocolRegistry,
    store: Arc<dyn CorrelationStore>,
    correlation_ttl: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher over an already filled registry.
    #[must_use]
    pub fn new(
        registry: ProtocolRegistry,
        store: Arc<dyn CorrelationStore>,
        correlation_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            correlation_ttl,
        }
    }

    /// Validates `config` and builds one adapter per configured protocol.
    pub fn from_config(
        config: &BrokerConfig,
        store: Arc<dyn CorrelationStore>,
        verifier: Arc<dyn SignatureVerifier>,
        signer: Option<Arc<dyn RequestSigner>>,
    ) -> BrokerResult<Self> {
        config.validate()?;

        let registry = ProtocolRegistry::new();
        if let Some(saml) = &config.saml2 {
            let adapter = Saml2Adapter::new(
                saml.clone(),
                &config.attributes,
                Arc::clone(&verifier),
                signer,
            )?;
            registry.register(adapter.into())?;
        }
        if let Some(openid) = &config.openid {
            registry.register(OpenIdAdapter::new(openid.clone(), &config.attributes)?.into())?;
        }
        if let Some(wsfed) = &config.ws_federation {
            let trace: Arc<dyn TraceHook> = Arc::new(LoggingTraceHook::new(config.trace.enabled));
            let adapter =
                WsFedAdapter::new(wsfed.clone(), &config.attributes, verifier, trace)?;
            registry.register(adapter.into())?;
        }
        if let Some(default) = &config.broker.default_protocol {
            registry.set_default(default)?;
        }

        tracing::info!(
            protocols = ?registry.list_protocols(),
            default = registry.default_protocol().unwrap_or("-"),
            "federation broker ready"
        );

        Ok(Self::new(registry, store, config.correlation_ttl()))
    }

    /// Returns the adapter registry.
    #[must_use]
    pub const fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Starts an exchange for `session_id`.
    ///
    /// Uses `protocol_id`, or the default protocol when `None`. Any exchange
    /// in flight for the same session and protocol is replaced.
    pub async fn initiate(
        &self,
        protocol_id: Option<&str>,
        target: &TargetDescriptor,
        session_id: &str,
    ) -> BrokerResult<OutboundInstruction> {
        if session_id.is_empty() {
            return Err(BrokerError::InvalidRequest("empty session id".into()));
        }

        let adapter = self.registry.resolve(protocol_id)?;
        let protocol = adapter.identify();

        let Initiation { instruction, state } = adapter.initiate(target).inspect_err(|e| {
            tracing::warn!(protocol, session = session_id, error = %e, "failed to build request");
        })?;
        let exchange_id = state.exchange_id.clone();

        let key = CorrelationKey::new(session_id, protocol);
        let stored = self.store.put(&key, state).await.inspect_err(|e| {
            tracing::error!(slot = %key, error = %e, "failed to store correlation state");
        })?;

        if stored == PutOutcome::Replaced {
            ExchangeEvent::builder(EventType::ExchangeSuperseded)
                .protocol(protocol)
                .session(session_id)
                .build()
                .emit();
        }
        ExchangeEvent::builder(EventType::ExchangeInitiated)
            .protocol(protocol)
            .session(session_id)
            .detail("exchange_id", exchange_id)
            .detail("destination", instruction.url())
            .build()
            .emit();

        Ok(instruction)
    }

    /// Completes the exchange in flight for `session_id` and `protocol_id`.
    ///
    /// The correlation state is consumed whatever the result.
    pub async fn complete(
        &self,
        protocol_id: &str,
        session_id: &str,
        inbound: &InboundMessage,
    ) -> Outcome {
        let Some(adapter) = self.registry.get(protocol_id) else {
            return reject(protocol_id, session_id, RejectReason::Unverified, "unknown protocol");
        };

        let key = CorrelationKey::new(session_id, protocol_id);
        let state = match self.store.take_and_clear(&key).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                return reject(
                    protocol_id,
                    session_id,
                    RejectReason::Unverified,
                    "no exchange in flight",
                )
            }
            Err(e) => {
                tracing::error!(slot = %key, error = %e, "failed to read correlation state");
                return reject(
                    protocol_id,
                    session_id,
                    RejectReason::Unverified,
                    "correlation store failure",
                );
            }
        };

        if state.protocol_id != protocol_id {
            return reject(
                protocol_id,
                session_id,
                RejectReason::Unverified,
                "state recorded for another protocol",
            );
        }
        if state.is_expired(self.correlation_ttl) {
            return reject(
                protocol_id,
                session_id,
                RejectReason::Expired,
                "correlation state expired",
            );
        }

        match adapter.complete(inbound, &state).await {
            ValidationResult::Verified(verified) => {
                let attributes = adapter.map_attributes(verified.raw_attributes);

                ExchangeEvent::builder(EventType::ExchangeCompleted)
                    .protocol(protocol_id)
                    .session(session_id)
                    .user(verified.subject_id.as_str())
                    .detail("exchange_id", state.exchange_id.as_str())
                    .detail("attributes", attributes.len().to_string())
                    .build()
                    .emit();

                Outcome::Success {
                    user_id: verified.subject_id,
                    attributes,
                    relay_state: state.relay_state,
                }
            }
            ValidationResult::Rejected(reason) => {
                reject(protocol_id, session_id, reason, "response rejected")
            }
        }
    }

    /// Removes correlation state older than the configured lifetime.
    pub async fn purge_expired(&self) -> BrokerResult<usize> {
        let purged = self.store.purge_expired(self.correlation_ttl).await?;
        if purged > 0 {
            tracing::debug!(purged, "purged expired correlation state");
        }
        Ok(purged)
    }
}

fn reject(protocol_id: &str, session_id: &str, reason: RejectReason, detail: &str) -> Outcome {
    ExchangeEvent::builder(EventType::ExchangeRejected)
        .failure(reason.as_str(), reason.category())
        .protocol(protocol_id)
        .session(session_id)
        .detail("detail", detail)
        .build()
        .emit();
    Outcome::failure(reason)
}
