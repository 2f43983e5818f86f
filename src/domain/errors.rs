//! # Domain Errors
//!
//! Errors raised by domain rules, independent of persistence or runtime.

use thiserror::Error;

/// Error type for domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An event reached the fold step that the data model cannot apply.
    ///
    /// Only domain events are folded; any other event here means the
    /// transition table and the data model disagree.
    #[error("unhandled event in fold: {event}")]
    UnhandledEvent {
        /// Name of the offending event.
        event: String,
    },

    /// A persisted value does not name a known state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Input validation failed.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Creates an unhandled-event error.
    #[must_use]
    pub fn unhandled_event(event: impl Into<String>) -> Self {
        Self::UnhandledEvent {
            event: event.into(),
        }
    }

    /// Returns true if this is an unhandled-event error.
    #[must_use]
    pub fn is_unhandled_event(&self) -> bool {
        matches!(self, Self::UnhandledEvent { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
