//! Exchange audit events.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! Every initiation and completion produces one event. Events are emitted
//! through `tracing`; the hosting application decides where they go.
//!
//! ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
//!
//! All events include:
//! - Timestamp (ISO 8601)
//! - Event type and outcome
//! - Protocol and session (when available)
//! - Subject identifier (on success)
//! - Rejection reason and category (on failure)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCategory;

/// Lifecycle state of one exchange.
///
/// `Idle -> Initiated` on initiate; `Initiated -> CompletedSuccess` or
/// `Initiated -> CompletedFailure` on complete. A second initiate for the
/// same slot replaces the exchange instead of looping on `Initiated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatus {
    /// No exchange in flight.
    #[default]
    Idle,
    /// Request sent, correlation state stored.
    Initiated,
    /// Response validated.
    CompletedSuccess,
    /// Response rejected or missing correlation state.
    CompletedFailure,
}

impl ExchangeStatus {
    /// Returns whether `next` is a legal successor of this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Initiated)
                | (Self::Initiated, Self::CompletedSuccess | Self::CompletedFailure)
                | (Self::CompletedSuccess | Self::CompletedFailure, Self::Initiated)
        )
    }

    /// Returns whether the exchange is finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CompletedSuccess | Self::CompletedFailure)
    }
}

/// Exchange event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Authentication request built and correlation state stored.
    ExchangeInitiated,
    /// An in-flight exchange was replaced by a newer initiation.
    ExchangeSuperseded,
    /// Response validated, subject identified.
    ExchangeCompleted,
    /// Response rejected.
    ExchangeRejected,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for one exchange step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEvent {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Exchange status after this event.
    pub status: ExchangeStatus,

    /// Protocol id.
    pub protocol_id: Option<String>,

    /// Caller session.
    pub session_id: Option<String>,

    /// Authenticated subject.
    pub user_id: Option<String>,

    /// Rejection reason (for failure events).
    pub reason: Option<String>,

    /// Category of the rejection reason.
    pub category: Option<ErrorCategory>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl ExchangeEvent {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> ExchangeEventBuilder {
        ExchangeEventBuilder::new(event_type)
    }

    /// Writes the event to the `tracing` pipeline.
    ///
    /// Successes log at info. Protocol violations log at warn. Other
    /// failures log at info, except transport failures which log at error.
    pub fn emit(&self) {
        let protocol = self.protocol_id.as_deref().unwrap_or("-");
        let session = self.session_id.as_deref().unwrap_or("-");
        let reason = self.reason.as_deref().unwrap_or("-");

        match (self.outcome, self.category) {
            (EventOutcome::Success, _) => tracing::info!(
                event_id = %self.id,
                event_type = ?self.event_type,
                status = ?self.status,
                protocol,
                session,
                user = self.user_id.as_deref().unwrap_or("-"),
                "exchange event"
            ),
            (EventOutcome::Failure, Some(ErrorCategory::ProtocolViolation)) => tracing::warn!(
                event_id = %self.id,
                event_type = ?self.event_type,
                status = ?self.status,
                protocol,
                session,
                reason,
                "security-relevant exchange failure"
            ),
            (EventOutcome::Failure, Some(ErrorCategory::Transport)) => tracing::error!(
                event_id = %self.id,
                event_type = ?self.event_type,
                status = ?self.status,
                protocol,
                session,
                reason,
                "exchange failed on transport"
            ),
            (EventOutcome::Failure, _) => tracing::info!(
                event_id = %self.id,
                event_type = ?self.event_type,
                status = ?self.status,
                protocol,
                session,
                reason,
                "exchange failed"
            ),
        }
    }
}

/// Builder for exchange events.
pub struct ExchangeEventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    status: ExchangeStatus,
    protocol_id: Option<String>,
    session_id: Option<String>,
    user_id: Option<String>,
    reason: Option<String>,
    category: Option<ErrorCategory>,
    details: Vec<(String, String)>,
}

impl ExchangeEventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        let status = match event_type {
            EventType::ExchangeInitiated | EventType::ExchangeSuperseded => {
                ExchangeStatus::Initiated
            }
            EventType::ExchangeCompleted => ExchangeStatus::CompletedSuccess,
            EventType::ExchangeRejected => ExchangeStatus::CompletedFailure,
        };
        Self {
            event_type,
            outcome: EventOutcome::Success,
            status,
            protocol_id: None,
            session_id: None,
            user_id: None,
            reason: None,
            category: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with a reason and its category.
    #[must_use]
    pub fn failure(mut self, reason: impl Into<String>, category: ErrorCategory) -> Self {
        self.outcome = EventOutcome::Failure;
        self.reason = Some(reason.into());
        self.category = Some(category);
        self
    }

    /// Sets the protocol id.
    #[must_use]
    pub fn protocol(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = Some(protocol_id.into());
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the authenticated subject.
    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> ExchangeEvent {
        ExchangeEvent {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            status: self.status,
            protocol_id: self.protocol_id,
            session_id: self.session_id,
            user_id: self.user_id,
            reason: self.reason,
            category: self.category,
            details: self.details,
        }
    }
}
