//! WS-Federation adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Security token service used to validate received tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenServiceConfig {
    /// WS-Trust endpoint URL.
    pub endpoint: String,

    /// Timeout per call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether received tokens are validated through the service.
    #[serde(default = "default_true")]
    pub validate_tokens: bool,
}

impl TokenServiceConfig {
    /// Creates a configuration for an endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: default_timeout_ms(),
            validate_tokens: true,
        }
    }

    /// Returns the call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// WS-Federation relying party settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFedConfig {
    /// Passive requestor endpoint of the token service.
    pub sts_url: String,

    /// Realm of the broker (`wtrealm`). Also the expected token audience.
    pub realm: String,

    /// Absolute reply URL (`wreply`).
    pub reply_url: Option<String>,

    /// Reply path, joined to the request origin when `reply_url` is unset.
    pub reply_path: Option<String>,

    /// Home realm hint (`whr`).
    pub home_realm: Option<String>,

    /// Whether tokens must carry a signature.
    #[serde(default = "default_true")]
    pub require_signed_tokens: bool,

    /// Allowed clock difference with the token service, in seconds.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,

    /// Active WS-Trust endpoint.
    pub token_service: Option<TokenServiceConfig>,
}

impl WsFedConfig {
    /// Creates a configuration with an absolute reply URL.
    #[must_use]
    pub fn new(
        sts_url: impl Into<String>,
        realm: impl Into<String>,
        reply_url: impl Into<String>,
    ) -> Self {
        Self {
            sts_url: sts_url.into(),
            realm: realm.into(),
            reply_url: Some(reply_url.into()),
            reply_path: None,
            home_realm: None,
            require_signed_tokens: true,
            clock_skew_secs: default_clock_skew(),
            token_service: None,
        }
    }

    /// Sets the token service.
    #[must_use]
    pub fn with_token_service(mut self, token_service: TokenServiceConfig) -> Self {
        self.token_service = Some(token_service);
        self
    }

    /// Returns the clock skew.
    #[must_use]
    pub const fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }

    /// Returns the token service when token validation is enabled.
    #[must_use]
    pub fn validating_token_service(&self) -> Option<&TokenServiceConfig> {
        self.token_service.as_ref().filter(|ts| ts.validate_tokens)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.sts_url).map_err(|e| format!("ws-federation: invalid sts_url: {e}"))?;

        if self.realm.is_empty() {
            return Err("ws-federation: realm is required".into());
        }

        match (&self.reply_url, &self.reply_path) {
            (None, None) => return Err("ws-federation: reply_url or reply_path is required".into()),
            (Some(url), _) => {
                url::Url::parse(url)
                    .map_err(|e| format!("ws-federation: invalid reply_url: {e}"))?;
            }
            (None, Some(_)) => {}
        }

        if let Some(ts) = &self.token_service {
            url::Url::parse(&ts.endpoint)
                .map_err(|e| format!("ws-federation: invalid token_service.endpoint: {e}"))?;
            if ts.timeout_ms == 0 {
                return Err("ws-federation: token_service.timeout_ms must be positive".into());
            }
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

const fn default_clock_skew() -> u64 {
    300
}

const fn default_timeout_ms() -> u64 {
    5_000
}
