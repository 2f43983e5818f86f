//! # Persistent Machine Core
//!
//! The synchronous half of a persistent FSM instance: current state, data,
//! sequence number and timeout, plus the pure steps the runtime composes.
//!
//! A delivered event goes through three steps:
//!
//! 1. [`decide`](PersistentFsm::decide): look up the rule and run its handler
//! 2. [`plan`](PersistentFsm::plan): fold the applied event into candidate data
//!    and build the journal entry
//! 3. [`commit`](PersistentFsm::commit): adopt the planned step once the entry
//!    is durable
//!
//! Nothing in memory changes before step 3, so a failed append leaves the
//! machine exactly as it was.
//!
//! [`recover`](PersistentFsm::recover) rebuilds a machine from a snapshot
//! and the journal tail without calling any handler.

use super::model::{FsmEvent, FsmModel, key_of};
use super::outcome::{Outcome, Transition};
use super::transition_table::TransitionTable;
use crate::application::error::{EngineError, EngineResult};
use crate::domain::value_objects::{EventId, PersistenceId, Timestamp};
use crate::infrastructure::persistence::{JournalEntry, SnapshotRecord};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The state of one persistent FSM instance.
pub struct PersistentFsm<M: FsmModel> {
    persistence_id: PersistenceId,
    table: Arc<TransitionTable<M>>,
    state: M::State,
    data: M::Data,
    sequence_nr: u64,
    state_timeout: Option<Duration>,
}

/// A transition ready to be persisted.
///
/// Produced by [`PersistentFsm::plan`]; applied by [`PersistentFsm::commit`].
pub struct PlannedStep<M: FsmModel> {
    entry: JournalEntry,
    state: M::State,
    data: M::Data,
    timeout: Option<Duration>,
}

impl<M: FsmModel> PlannedStep<M> {
    /// Returns the journal entry to append.
    #[must_use]
    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    /// Returns the state the machine will be in after commit.
    #[must_use]
    pub fn state(&self) -> M::State {
        self.state
    }

    /// Returns the data the machine will hold after commit.
    #[must_use]
    pub fn data(&self) -> &M::Data {
        &self.data
    }

    /// Returns the timeout to arm after commit.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<M: FsmModel> PersistentFsm<M> {
    /// Creates a machine in the model's initial state.
    #[must_use]
    pub fn new(persistence_id: PersistenceId, table: Arc<TransitionTable<M>>) -> Self {
        Self {
            persistence_id,
            table,
            state: M::initial_state(),
            data: M::initial_data(),
            sequence_nr: 0,
            state_timeout: None,
        }
    }

    /// Rebuilds a machine from its latest snapshot and the entries after it.
    ///
    /// Entries must be contiguous and start right after the snapshot's
    /// sequence number (or at 1 without a snapshot). Domain-event payloads
    /// are folded into data; each entry's state and timeout replace the
    /// current ones. No handler runs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if a stored value cannot be
    /// decoded or the entries are not contiguous, and
    /// [`EngineError::Domain`] if the fold rejects a stored event.
    pub fn recover(
        persistence_id: PersistenceId,
        table: Arc<TransitionTable<M>>,
        snapshot: Option<&SnapshotRecord>,
        entries: &[JournalEntry],
    ) -> EngineResult<Self> {
        let mut fsm = Self::new(persistence_id, table);

        if let Some(snapshot) = snapshot {
            fsm.state = serde_json::from_value(snapshot.state.clone())?;
            fsm.data = serde_json::from_value(snapshot.data.clone())?;
            fsm.sequence_nr = snapshot.sequence_nr;
            fsm.state_timeout = snapshot.state_timeout_ms.map(Duration::from_millis);
        }

        for entry in entries {
            fsm.replay(entry)?;
        }

        Ok(fsm)
    }

    fn replay(&mut self, entry: &JournalEntry) -> EngineResult<()> {
        let expected = self.sequence_nr.saturating_add(1);
        if entry.sequence_nr != expected {
            return Err(EngineError::serialization(format!(
                "journal for {} is not contiguous: expected sequence {expected}, found {}",
                self.persistence_id, entry.sequence_nr
            )));
        }

        if let Some(payload) = &entry.payload {
            let event: M::Event = serde_json::from_value(payload.clone())?;
            self.data = M::apply_event(&event, &self.data)?;
        }
        self.state = serde_json::from_value(entry.state.clone())?;
        self.state_timeout = entry.state_timeout_ms.map(Duration::from_millis);
        self.sequence_nr = entry.sequence_nr;
        Ok(())
    }

    /// Returns the persistence id.
    #[inline]
    #[must_use]
    pub fn persistence_id(&self) -> &PersistenceId {
        &self.persistence_id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> M::State {
        self.state
    }

    /// Returns the current data.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &M::Data {
        &self.data
    }

    /// Returns the sequence number of the last journaled entry.
    #[inline]
    #[must_use]
    pub fn sequence_nr(&self) -> u64 {
        self.sequence_nr
    }

    /// Returns the timeout armed on entry to the current state.
    #[inline]
    #[must_use]
    pub fn state_timeout(&self) -> Option<Duration> {
        self.state_timeout
    }

    /// Returns the transition table.
    #[must_use]
    pub fn table(&self) -> &TransitionTable<M> {
        &self.table
    }

    /// Routes `event` through the table and runs the matching handler.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnhandledEvent`] if no rule matches and
    /// [`EngineError::FaultInjected`] if the handler fails.
    pub fn decide(&self, event: &FsmEvent<M::Event>) -> EngineResult<Outcome<M>> {
        let rule = self
            .table
            .rule_for(self.state, key_of::<M>(event))
            .ok_or_else(|| EngineError::unhandled_event(&self.persistence_id, self.state, event))?;

        rule.invoke(event, &self.data)
            .map_err(|fault| EngineError::fault_injected(&self.persistence_id, self.state, fault.reason()))
    }

    /// Computes the result of `transition` without changing the machine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Domain`] if the fold rejects the applied event
    /// and [`EngineError::Serialization`] if the entry cannot be encoded.
    pub fn plan(&self, transition: &Transition<M>) -> EngineResult<PlannedStep<M>> {
        let (data, payload, event_name) = match transition.applied_event() {
            Some(event) => (
                M::apply_event(event, &self.data)?,
                Some(serde_json::to_value(event)?),
                Some(M::kind_of(event).to_string()),
            ),
            None => (self.data.clone(), None, None),
        };

        let state_timeout_ms = transition.timeout().map(millis);

        let entry = JournalEntry {
            persistence_id: self.persistence_id.clone(),
            sequence_nr: self.sequence_nr.saturating_add(1),
            event_id: EventId::new_v4(),
            event_name,
            payload,
            state: serde_json::to_value(transition.target())?,
            state_timeout_ms,
            recorded_at: Timestamp::now(),
        };

        Ok(PlannedStep {
            entry,
            state: transition.target(),
            data,
            timeout: transition.timeout(),
        })
    }

    /// Adopts a planned step after its entry was appended.
    pub fn commit(&mut self, step: PlannedStep<M>) {
        self.sequence_nr = step.entry.sequence_nr;
        self.state = step.state;
        self.data = step.data;
        self.state_timeout = step.timeout;
    }

    /// Captures the current state, data and armed timeout as a snapshot
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if state or data cannot be
    /// encoded.
    pub fn snapshot(&self) -> EngineResult<SnapshotRecord> {
        Ok(SnapshotRecord {
            persistence_id: self.persistence_id.clone(),
            sequence_nr: self.sequence_nr,
            state: serde_json::to_value(self.state)?,
            data: serde_json::to_value(&self.data)?,
            state_timeout_ms: self.state_timeout.map(millis),
            taken_at: Timestamp::now(),
        })
    }
}

fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl<M: FsmModel> fmt::Debug for PersistentFsm<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentFsm")
            .field("persistence_id", &self.persistence_id)
            .field("state", &self.state)
            .field("data", &self.data)
            .field("sequence_nr", &self.sequence_nr)
            .field("state_timeout", &self.state_timeout)
            .finish()
    }
}
