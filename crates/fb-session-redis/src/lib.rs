//! # fb-session-redis
//!
//! Redis correlation store for deployments where the caller's sessions are
//! shared across broker nodes.
//!
//! State is written with `SET .. EX` so abandoned exchanges expire on their
//! own, and consumed with `GETDEL` so two nodes racing on a duplicated
//! response cannot both complete it.
//!
//! ## Example
//!
//! ```ignore
//! use fb_session::{CorrelationKey, CorrelationStore, ExchangeState};
//! use fb_session_redis::{RedisConfig, RedisCorrelationStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::new("redis://localhost:6379/0");
//!     let store = RedisCorrelationStore::new(config, Duration::from_secs(600)).await?;
//!
//!     let key = CorrelationKey::new("sess1", "saml2");
//!     store.put(&key, ExchangeState::new("saml2", "_id1", "https://sp/acs")).await?;
//!     let state = store.take_and_clear(&key).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod store;

pub use config::RedisConfig;
pub use store::RedisCorrelationStore;
