//! Diagnostic trace hook for token service traffic.
//!
//! A hook observes every message body sent to or received from the security
//! token service. It cannot alter a body, and an error it returns is logged
//! and otherwise ignored.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn, Level};

/// Message direction relative to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent to the token service.
    Outbound,
    /// Received from the token service.
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outbound => f.write_str("outbound"),
            Self::Inbound => f.write_str("inbound"),
        }
    }
}

/// Failure inside a trace hook.
#[derive(Debug, Clone, Error)]
#[error("trace hook failed: {0}")]
pub struct TraceError(pub String);

/// Observes token service messages.
pub trait TraceHook: Send + Sync {
    /// Called with every regular message body.
    fn on_message(&self, direction: Direction, body: &str) -> Result<(), TraceError>;

    /// Called with every fault body.
    fn on_fault(&self, direction: Direction, body: &str) -> Result<(), TraceError>;
}

/// Logs message bodies at `debug` level.
#[derive(Debug, Clone, Copy)]
pub struct LoggingTraceHook {
    enabled: bool,
}

impl LoggingTraceHook {
    /// Creates the hook. A disabled hook logs nothing.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn active(&self) -> bool {
        self.enabled && tracing::enabled!(Level::DEBUG)
    }
}

impl TraceHook for LoggingTraceHook {
    fn on_message(&self, direction: Direction, body: &str) -> Result<(), TraceError> {
        if self.active() {
            debug!(%direction, body, "token service message");
        }
        Ok(())
    }

    fn on_fault(&self, direction: Direction, body: &str) -> Result<(), TraceError> {
        if self.active() {
            debug!(%direction, body, "token service fault");
        }
        Ok(())
    }
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceHook;

impl TraceHook for NoopTraceHook {
    fn on_message(&self, _direction: Direction, _body: &str) -> Result<(), TraceError> {
        Ok(())
    }

    fn on_fault(&self, _direction: Direction, _body: &str) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Passes a message to the hook, logging and discarding any hook error.
pub(crate) fn observe(hook: &dyn TraceHook, direction: Direction, body: &str, fault: bool) {
    let result = if fault {
        hook.on_fault(direction, body)
    } else {
        hook.on_message(direction, body)
    };
    if let Err(e) = result {
        warn!(error = %e, %direction, "trace hook error ignored");
    }
}
