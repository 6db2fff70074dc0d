//! Exchanges backed by a Redis correlation store.
//!
//! Run with `cargo test -- --ignored` on a machine with Docker.

use std::sync::Arc;
use std::time::Duration;

use fb_broker::{BrokerConfig, Dispatcher, Outcome};
use fb_protocol::{protocol_id, RejectReason, TargetDescriptor};
use fb_session::CorrelationStore;
use fb_session_redis::{RedisConfig, RedisCorrelationStore};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::redis::Redis;

use crate::common::{
    broker_toml, init_tracing, saml_request_id, saml_response, StubVerifier, ACS,
};

/// Starts Redis and a dispatcher on top of it. The container lives as long
/// as the returned handle.
async fn redis_dispatcher() -> anyhow::Result<(ContainerAsync<Redis>, Dispatcher)> {
    init_tracing();

    let redis = Redis::default().start().await?;
    let port = redis.get_host_port_ipv4(6379).await?;
    let store = RedisCorrelationStore::new(
        RedisConfig::new(format!("redis://127.0.0.1:{port}/0")),
        Duration::from_secs(600),
    )
    .await?;

    let config = BrokerConfig::from_toml_str(&broker_toml())?;
    let dispatcher = Dispatcher::from_config(
        &config,
        Arc::new(store) as Arc<dyn CorrelationStore>,
        Arc::new(StubVerifier { accept: true }),
        None,
    )?;

    Ok((redis, dispatcher))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_store_completes_once() -> anyhow::Result<()> {
    let (_redis, dispatcher) = redis_dispatcher().await?;

    let instruction = dispatcher
        .initiate(Some(protocol_id::SAML2), &TargetDescriptor::new(), "redis-1")
        .await?;
    let response = saml_response(&saml_request_id(&instruction)?, ACS);

    assert!(dispatcher
        .complete(protocol_id::SAML2, "redis-1", &response)
        .await
        .is_success());
    assert_eq!(
        dispatcher.complete(protocol_id::SAML2, "redis-1", &response).await,
        Outcome::failure(RejectReason::Unverified)
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_store_keeps_latest_exchange() -> anyhow::Result<()> {
    let (_redis, dispatcher) = redis_dispatcher().await?;

    let first = dispatcher
        .initiate(Some(protocol_id::SAML2), &TargetDescriptor::new(), "redis-2")
        .await?;
    dispatcher
        .initiate(Some(protocol_id::SAML2), &TargetDescriptor::new(), "redis-2")
        .await?;

    let stale = saml_response(&saml_request_id(&first)?, ACS);
    assert_eq!(
        dispatcher.complete(protocol_id::SAML2, "redis-2", &stale).await,
        Outcome::failure(RejectReason::Unverified)
    );
    Ok(())
}
