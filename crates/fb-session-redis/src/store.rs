//! Redis correlation store.

use std::time::Duration;

use async_trait::async_trait;
use fb_session::{CorrelationKey, CorrelationStore, ExchangeState, PutOutcome, SessionResult};
use fred::prelude::*;

use crate::config::RedisConfig;
use crate::error::from_redis_error;

/// Correlation store backed by Redis.
///
/// Entries expire after the configured time-to-live, so
/// [`CorrelationStore::purge_expired`] has nothing to do.
pub struct RedisCorrelationStore {
    client: Client,
    config: RedisConfig,
    ttl: Duration,
}

impl RedisCorrelationStore {
    /// Connects to Redis.
    ///
    /// ## Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn new(config: RedisConfig, ttl: Duration) -> SessionResult<Self> {
        let connection = ConnectionConfig {
            connection_timeout: config.connect_timeout(),
            ..ConnectionConfig::default()
        };
        let client = Client::new(
            config.client_config()?,
            None,
            Some(connection),
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;
        tracing::debug!(prefix = %config.key_prefix, "correlation store connected");

        Ok(Self {
            client,
            config,
            ttl,
        })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn key(&self, key: &CorrelationKey) -> String {
        self.config.slot_key(key)
    }
}

/// Safely convert seconds to i64 for Redis expiration.
#[allow(clippy::cast_possible_wrap)]
const fn seconds_to_i64(seconds: u64) -> i64 {
    seconds as i64
}

#[async_trait]
impl CorrelationStore for RedisCorrelationStore {
    async fn put(&self, key: &CorrelationKey, state: ExchangeState) -> SessionResult<PutOutcome> {
        let redis_key = self.key(key);
        let serialized = serde_json::to_string(&state)?;
        let seconds = seconds_to_i64(self.ttl.as_secs().max(1));

        // SET .. GET returns the previous value, if any.
        let previous: Option<String> = self
            .client
            .set(
                &redis_key,
                serialized,
                Some(Expiration::EX(seconds)),
                None,
                true,
            )
            .await
            .map_err(from_redis_error)?;

        Ok(match previous {
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Stored,
        })
    }

    async fn take_and_clear(&self, key: &CorrelationKey) -> SessionResult<Option<ExchangeState>> {
        let redis_key = self.key(key);
        let value: Option<String> = self
            .client
            .getdel(&redis_key)
            .await
            .map_err(from_redis_error)?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    async fn purge_expired(&self, _max_age: Duration) -> SessionResult<usize> {
        Ok(0)
    }
}
