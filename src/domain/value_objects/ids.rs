//! # Identifiers
//!
//! Identity types for FSM instances and journal entries.
//!
//! - [`PersistenceId`]: stable, caller-chosen identity of one negotiation
//! - [`EventId`]: UUID assigned to every journal entry

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a persistent FSM instance.
///
/// Every journal entry and snapshot is keyed by it, and restarting with the
/// same id recovers the same negotiation.
///
/// # Examples
///
/// ```
/// use rfq_fsm::domain::value_objects::PersistenceId;
///
/// let id = PersistenceId::new("Request1");
/// assert_eq!(id.as_str(), "Request1");
/// assert_eq!(id.to_string(), "Request1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistenceId(String);

impl PersistenceId {
    /// Creates a persistence id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a random, UUID-based persistence id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersistenceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PersistenceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Wraps an existing UUID (for reconstruction from storage).
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a random v4 id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
