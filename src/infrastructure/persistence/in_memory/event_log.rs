//! # In-Memory Event Log
//!
//! In-memory implementation of [`EventLog`] for tests and the demo driver.
//!
//! Journals and snapshots live in a thread-safe `HashMap`. Clones share the
//! same storage, so a restarted instance sees what a crashed one wrote.
//! Failures can be injected to exercise write-ahead behaviour.

use crate::domain::value_objects::PersistenceId;
use crate::infrastructure::persistence::traits::{
    EventLog, EventLogError, EventLogResult, JournalEntry, SnapshotRecord,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
struct Journal {
    entries: Vec<JournalEntry>,
    snapshots: Vec<SnapshotRecord>,
}

/// In-memory implementation of [`EventLog`].
///
/// # Examples
///
/// ```
/// use rfq_fsm::infrastructure::persistence::in_memory::InMemoryEventLog;
///
/// let log = InMemoryEventLog::new();
/// assert!(log.is_empty());
///
/// // The next append fails with a retryable connection error.
/// log.fail_next_appends(1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    storage: Arc<RwLock<HashMap<PersistenceId, Journal>>>,
    failing_appends: Arc<AtomicU32>,
    failing_snapshots: Arc<AtomicU32>,
}

impl InMemoryEventLog {
    /// Creates a new empty in-memory event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of journals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Returns true if no journal exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of every entry stored for `persistence_id`.
    #[must_use]
    pub fn entries(&self, persistence_id: &PersistenceId) -> Vec<JournalEntry> {
        self.storage
            .read()
            .get(persistence_id)
            .map(|journal| journal.entries.clone())
            .unwrap_or_default()
    }

    /// Returns a copy of every snapshot stored for `persistence_id`.
    #[must_use]
    pub fn snapshots(&self, persistence_id: &PersistenceId) -> Vec<SnapshotRecord> {
        self.storage
            .read()
            .get(persistence_id)
            .map(|journal| journal.snapshots.clone())
            .unwrap_or_default()
    }

    /// Makes the next `count` appends fail with a connection error.
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` snapshot writes fail with a connection error.
    pub fn fail_next_snapshots(&self, count: u32) {
        self.failing_snapshots.store(count, Ordering::SeqCst);
    }

    /// Clears all journals and snapshots.
    pub fn clear(&self) {
        self.storage.write().clear();
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, entry: JournalEntry) -> EventLogResult<()> {
        if Self::take_failure(&self.failing_appends) {
            return Err(EventLogError::connection("injected append failure"));
        }

        let mut storage = self.storage.write();
        let journal = storage.entry(entry.persistence_id.clone()).or_default();
        let expected = journal
            .entries
            .last()
            .map_or(1, |last| last.sequence_nr.saturating_add(1));
        if entry.sequence_nr != expected {
            return Err(EventLogError::sequence_conflict(
                &entry.persistence_id,
                expected,
                entry.sequence_nr,
            ));
        }
        journal.entries.push(entry);
        Ok(())
    }

    async fn read_from(
        &self,
        persistence_id: &PersistenceId,
        after_sequence_nr: u64,
    ) -> EventLogResult<Vec<JournalEntry>> {
        let storage = self.storage.read();
        Ok(storage
            .get(persistence_id)
            .map(|journal| {
                journal
                    .entries
                    .iter()
                    .filter(|e| e.sequence_nr > after_sequence_nr)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn write_snapshot(&self, snapshot: SnapshotRecord) -> EventLogResult<()> {
        if Self::take_failure(&self.failing_snapshots) {
            return Err(EventLogError::connection("injected snapshot failure"));
        }

        let mut storage = self.storage.write();
        storage
            .entry(snapshot.persistence_id.clone())
            .or_default()
            .snapshots
            .push(snapshot);
        Ok(())
    }

    async fn read_latest_snapshot(
        &self,
        persistence_id: &PersistenceId,
    ) -> EventLogResult<Option<SnapshotRecord>> {
        let storage = self.storage.read();
        Ok(storage
            .get(persistence_id)
            .and_then(|journal| journal.snapshots.last().cloned()))
    }

    async fn highest_sequence_nr(&self, persistence_id: &PersistenceId) -> EventLogResult<u64> {
        let storage = self.storage.read();
        Ok(storage
            .get(persistence_id)
            .and_then(|journal| journal.entries.last())
            .map_or(0, |last| last.sequence_nr))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{EventId, Timestamp};
    use serde_json::json;

    fn entry(id: &str, sequence_nr: u64) -> JournalEntry {
        JournalEntry {
            persistence_id: PersistenceId::new(id),
            sequence_nr,
            event_id: EventId::new_v4(),
            event_name: None,
            payload: None,
            state: json!("ORDER"),
            state_timeout_ms: None,
            recorded_at: Timestamp::now(),
        }
    }

    fn snapshot(id: &str, sequence_nr: u64) -> SnapshotRecord {
        SnapshotRecord {
            persistence_id: PersistenceId::new(id),
            sequence_nr,
            state: json!("ORDER"),
            data: json!({}),
            state_timeout_ms: None,
            taken_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn new_log_is_empty() {
        let log = InMemoryEventLog::new();
        assert!(log.is_empty());
        let id = PersistenceId::new("rfq-1");
        assert_eq!(log.highest_sequence_nr(&id).await.unwrap(), 0);
        assert!(log.read_all(&id).await.unwrap().is_empty());
        assert!(log.read_latest_snapshot(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_and_read_in_order() {
        let log = InMemoryEventLog::new();
        let id = PersistenceId::new("rfq-1");
        for seq in 1..=3 {
            log.append(entry("rfq-1", seq)).await.unwrap();
        }

        let all = log.read_all(&id).await.unwrap();
        let seqs: Vec<u64> = all.iter().map(|e| e.sequence_nr).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(log.highest_sequence_nr(&id).await.unwrap(), 3);

        let tail = log.read_from(&id, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].sequence_nr, 3);
    }

    #[tokio::test]
    async fn read_all_is_restartable() {
        let log = InMemoryEventLog::new();
        let id = PersistenceId::new("rfq-1");
        log.append(entry("rfq-1", 1)).await.unwrap();
        assert_eq!(log.read_all(&id).await.unwrap(), log.read_all(&id).await.unwrap());
    }

    #[tokio::test]
    async fn gap_in_sequence_is_rejected() {
        let log = InMemoryEventLog::new();
        log.append(entry("rfq-1", 1)).await.unwrap();
        let err = log.append(entry("rfq-1", 3)).await.unwrap_err();
        assert!(err.is_sequence_conflict());
    }

    #[tokio::test]
    async fn journals_are_isolated() {
        let log = InMemoryEventLog::new();
        log.append(entry("rfq-1", 1)).await.unwrap();
        log.append(entry("rfq-2", 1)).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries(&PersistenceId::new("rfq-1")).len(), 1);
    }

    #[tokio::test]
    async fn injected_append_failure_is_consumed() {
        let log = InMemoryEventLog::new();
        log.fail_next_appends(1);
        let err = log.append(entry("rfq-1", 1)).await.unwrap_err();
        assert!(err.is_retryable());
        log.append(entry("rfq-1", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let log = InMemoryEventLog::new();
        let id = PersistenceId::new("rfq-1");
        log.write_snapshot(snapshot("rfq-1", 1)).await.unwrap();
        log.write_snapshot(snapshot("rfq-1", 4)).await.unwrap();
        let latest = log.read_latest_snapshot(&id).await.unwrap().unwrap();
        assert_eq!(latest.sequence_nr, 4);
        assert_eq!(log.snapshots(&id).len(), 2);
    }

    #[tokio::test]
    async fn injected_snapshot_failure() {
        let log = InMemoryEventLog::new();
        log.fail_next_snapshots(1);
        assert!(log.write_snapshot(snapshot("rfq-1", 1)).await.is_err());
        assert!(log.snapshots(&PersistenceId::new("rfq-1")).is_empty());
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let log = InMemoryEventLog::new();
        let clone = log.clone();
        log.append(entry("rfq-1", 1)).await.unwrap();
        assert_eq!(clone.entries(&PersistenceId::new("rfq-1")).len(), 1);
        clone.clear();
        assert!(log.is_empty());
    }
}
