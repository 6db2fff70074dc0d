//! End-to-end exchange tests.
//!
//! These tests drive the [`fb_broker::Dispatcher`] the way a web layer
//! would: initiate, hand the instruction to a simulated identity provider,
//! then complete with the provider's answer. Redis-backed tests use
//! testcontainers and are ignored by default.

mod common;
mod properties;
mod redis_store;
mod scenarios;
mod token_service;
