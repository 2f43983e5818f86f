//! # Engine Errors
//!
//! Error types surfaced to callers of the persistent FSM engine.
//!
//! # Error Taxonomy
//!
//! - **Routing**: no rule for the (state, event) pair ([`EngineError::UnhandledEvent`])
//! - **Persistence**: the journal rejected or timed out an append or snapshot
//! - **Fault**: a handler failed on purpose; the instance is torn down
//! - **Availability**: the instance is stopped, crashed or unreachable
//! - **Domain**: the data fold rejected an event
//! - **Serialization**: a state, event or data value could not be encoded or decoded
//! - **Table**: a transition table failed validation at build time

use crate::domain::errors::DomainError;
use crate::infrastructure::persistence::EventLogError;
use std::fmt;
use thiserror::Error;

/// Error type for engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No transition rule matches the current state and event.
    ///
    /// State and data are unchanged and nothing was persisted.
    #[error("unhandled event {event} in state {state} for {persistence_id}")]
    UnhandledEvent {
        /// Instance the event was delivered to.
        persistence_id: String,
        /// State the instance was in.
        state: String,
        /// Name of the event.
        event: String,
    },

    /// Appending to the journal or writing a snapshot failed.
    ///
    /// The in-memory state is unchanged; the same event may be retried.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] EventLogError),

    /// A handler raised a fault. The instance stops processing.
    #[error("fault injected in {persistence_id} during {state}: {reason}")]
    FaultInjected {
        /// Instance that failed.
        persistence_id: String,
        /// State the instance was in.
        state: String,
        /// Fault description.
        reason: String,
    },

    /// The instance is stopped or crashed and must be restarted.
    #[error("instance unavailable: {0}")]
    InstanceUnavailable(String),

    /// The data fold rejected an event.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A value could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The transition table is not well formed.
    #[error("invalid transition table: {0}")]
    InvalidTransitionTable(String),
}

impl EngineError {
    /// Creates an unhandled-event error.
    #[must_use]
    pub fn unhandled_event(
        persistence_id: impl fmt::Display,
        state: impl fmt::Display,
        event: impl fmt::Display,
    ) -> Self {
        Self::UnhandledEvent {
            persistence_id: persistence_id.to_string(),
            state: state.to_string(),
            event: event.to_string(),
        }
    }

    /// Creates a fault-injected error.
    #[must_use]
    pub fn fault_injected(
        persistence_id: impl fmt::Display,
        state: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::FaultInjected {
            persistence_id: persistence_id.to_string(),
            state: state.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an instance-unavailable error.
    #[must_use]
    pub fn instance_unavailable(persistence_id: impl fmt::Display) -> Self {
        Self::InstanceUnavailable(persistence_id.to_string())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates an invalid-transition-table error.
    #[must_use]
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self::InvalidTransitionTable(message.into())
    }

    /// Returns true if the instance cannot keep running after this error.
    ///
    /// Faults, fold failures and sequence conflicts leave the instance out
    /// of step with its journal, so it is torn down and must be restarted
    /// through recovery.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::FaultInjected { .. } | Self::Domain(_) | Self::Serialization(_) => true,
            Self::PersistenceFailure(e) => e.is_sequence_conflict(),
            _ => false,
        }
    }

    /// Returns true if delivering the same event again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PersistenceFailure(e) => !e.is_sequence_conflict(),
            _ => false,
        }
    }

    /// Returns true if this is an unhandled-event error.
    #[must_use]
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Self::UnhandledEvent { .. })
    }

    /// Returns true if this is an instance-unavailable error.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::InstanceUnavailable(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
