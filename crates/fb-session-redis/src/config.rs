//! Connection settings for the Redis correlation store.

use std::time::Duration;

use fb_session::{CorrelationKey, SessionError, SessionResult};
use fred::types::config::Config;
use serde::{Deserialize, Serialize};

/// Where correlation state lives and how its keys are named.
///
/// ```toml
/// url = "redis://cache.internal:6379/2"
/// key_prefix = "broker-eu"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Server URL (`redis://` or `rediss://`, with optional database index).
    #[serde(default = "default_url")]
    pub url: String,

    /// Password, when not embedded in the URL.
    pub password: Option<String>,

    /// Namespace in front of every slot key, so several brokers can share
    /// one server.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new(default_url())
    }
}

impl RedisConfig {
    /// Creates settings for a server URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            password: None,
            key_prefix: default_key_prefix(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the key namespace.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Returns the connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Builds the client configuration.
    pub fn client_config(&self) -> SessionResult<Config> {
        let mut config = Config::from_url(&self.url)
            .map_err(|e| SessionError::Storage(format!("invalid redis url: {e}")))?;
        if self.password.is_some() {
            config.password.clone_from(&self.password);
        }
        Ok(config)
    }

    /// Returns the Redis key of a correlation slot.
    #[must_use]
    pub fn slot_key(&self, key: &CorrelationKey) -> String {
        if self.key_prefix.is_empty() {
            key.storage_key()
        } else {
            format!("{}:{}", self.key_prefix, key.storage_key())
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "fb".to_string()
}

const fn default_connect_timeout() -> u64 {
    5_000
}
