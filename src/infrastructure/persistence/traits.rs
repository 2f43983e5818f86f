//! # Event Log Port
//!
//! Persistence abstraction for persistent state machines.
//!
//! An [`EventLog`] keeps, per [`PersistenceId`], an append-only journal of
//! [`JournalEntry`] values plus any number of [`SnapshotRecord`]s. Payloads
//! are stored as JSON so that one log serves any state machine model.
//!
//! The journal is the source of truth; snapshots are a recovery shortcut and
//! never truncate it.
//!
//! # Examples
//!
//! ```ignore
//! use rfq_fsm::infrastructure::persistence::traits::EventLog;
//!
//! async fn history_len(log: &impl EventLog, id: &PersistenceId) -> usize {
//!     log.read_all(id).await.map(|entries| entries.len()).unwrap_or(0)
//! }
//! ```

use crate::domain::value_objects::{EventId, PersistenceId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for event log operations.
#[derive(Debug, Clone, Error)]
pub enum EventLogError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// An append did not continue the journal's sequence.
    #[error(
        "Sequence conflict for {persistence_id}: expected sequence {expected}, got {actual}"
    )]
    SequenceConflict {
        /// Journal identity.
        persistence_id: String,
        /// Sequence number the log expected next.
        expected: u64,
        /// Sequence number that was offered.
        actual: u64,
    },

    /// The operation did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventLogError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a deserialization error.
    #[must_use]
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Creates a sequence conflict error.
    #[must_use]
    pub fn sequence_conflict(persistence_id: &PersistenceId, expected: u64, actual: u64) -> Self {
        Self::SequenceConflict {
            persistence_id: persistence_id.to_string(),
            expected,
            actual,
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Returns true if this is a sequence conflict.
    #[must_use]
    pub fn is_sequence_conflict(&self) -> bool {
        matches!(self, Self::SequenceConflict { .. })
    }
}

/// Result type for event log operations.
pub type EventLogResult<T> = Result<T, EventLogError>;

/// One journaled state machine step.
///
/// Every transition produces one entry recording the state it moved to and
/// the state timeout it armed. Steps that applied a domain event also carry
/// that event's name and JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Journal identity.
    pub persistence_id: PersistenceId,
    /// Position in the journal, starting at 1 and contiguous.
    pub sequence_nr: u64,
    /// Unique entry identifier.
    pub event_id: EventId,
    /// Name of the applied domain event, if any.
    pub event_name: Option<String>,
    /// JSON payload of the applied domain event, if any.
    pub payload: Option<serde_json::Value>,
    /// JSON encoding of the state entered.
    pub state: serde_json::Value,
    /// State timeout armed on entering `state`, in milliseconds.
    pub state_timeout_ms: Option<u64>,
    /// When the entry was written.
    pub recorded_at: Timestamp,
}

impl JournalEntry {
    /// Returns true if this entry carries a domain event.
    #[inline]
    #[must_use]
    pub fn has_domain_event(&self) -> bool {
        self.payload.is_some()
    }
}

/// Point-in-time capture of a state machine's state and data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Journal identity.
    pub persistence_id: PersistenceId,
    /// Last journal sequence number the snapshot covers.
    pub sequence_nr: u64,
    /// JSON encoding of the state.
    pub state: serde_json::Value,
    /// JSON encoding of the data.
    pub data: serde_json::Value,
    /// State timeout armed when the snapshot's state was entered, in
    /// milliseconds.
    #[serde(default)]
    pub state_timeout_ms: Option<u64>,
    /// When the snapshot was taken.
    pub taken_at: Timestamp,
}

/// Durable, per-instance ordered journal plus snapshots.
///
/// Implementations must reject an append whose `sequence_nr` is not exactly
/// one past the highest stored sequence number for that id.
#[async_trait]
pub trait EventLog: Send + Sync + fmt::Debug {
    /// Appends one entry to the journal of `entry.persistence_id`.
    ///
    /// # Errors
    ///
    /// Returns `EventLogError::SequenceConflict` if the entry does not
    /// continue the journal, or a backend error.
    async fn append(&self, entry: JournalEntry) -> EventLogResult<()>;

    /// Reads the entries with a sequence number greater than
    /// `after_sequence_nr`, in order.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the journal cannot be read.
    async fn read_from(
        &self,
        persistence_id: &PersistenceId,
        after_sequence_nr: u64,
    ) -> EventLogResult<Vec<JournalEntry>>;

    /// Reads the whole journal, in order. Calling it again restarts from the
    /// first entry.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the journal cannot be read.
    async fn read_all(&self, persistence_id: &PersistenceId) -> EventLogResult<Vec<JournalEntry>> {
        self.read_from(persistence_id, 0).await
    }

    /// Stores a snapshot.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the snapshot cannot be written.
    async fn write_snapshot(&self, snapshot: SnapshotRecord) -> EventLogResult<()>;

    /// Reads the most recent snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns a backend error if snapshots cannot be read.
    async fn read_latest_snapshot(
        &self,
        persistence_id: &PersistenceId,
    ) -> EventLogResult<Option<SnapshotRecord>>;

    /// Returns the highest stored sequence number, 0 for an empty journal.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the journal cannot be read.
    async fn highest_sequence_nr(&self, persistence_id: &PersistenceId) -> EventLogResult<u64>;
}
