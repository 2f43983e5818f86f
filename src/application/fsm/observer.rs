//! # Transition Observers
//!
//! Hooks called by an instance after it changes, keeps or fails to route
//! an event. Observers run on the instance task after the journal write, so
//! they see only committed transitions. They are not called while replaying
//! the journal during recovery; [`TransitionObserver::on_recovered`] fires
//! once when replay is complete.

use super::model::{FsmEvent, FsmModel};
use crate::domain::value_objects::PersistenceId;
use tracing::{debug, info, warn};

/// Receives notifications about an instance's lifecycle.
///
/// Every method has an empty default body.
pub trait TransitionObserver<M: FsmModel>: Send + Sync {
    /// A transition was persisted and applied.
    fn on_transition(
        &self,
        _persistence_id: &PersistenceId,
        _from: M::State,
        _to: M::State,
        _data: &M::Data,
        _trigger: &FsmEvent<M::Event>,
    ) {
    }

    /// A handler decided to stay.
    fn on_stay(&self, _persistence_id: &PersistenceId, _state: M::State, _trigger: &FsmEvent<M::Event>) {}

    /// No rule matched.
    fn on_unhandled(
        &self,
        _persistence_id: &PersistenceId,
        _state: M::State,
        _trigger: &FsmEvent<M::Event>,
    ) {
    }

    /// Recovery finished.
    fn on_recovered(
        &self,
        _persistence_id: &PersistenceId,
        _state: M::State,
        _data: &M::Data,
        _sequence_nr: u64,
    ) {
    }

    /// The instance is being torn down after a fatal error.
    fn on_fault(&self, _persistence_id: &PersistenceId, _state: M::State, _reason: &str) {}
}

/// Observer that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl<M: FsmModel> TransitionObserver<M> for TracingObserver {
    fn on_transition(
        &self,
        persistence_id: &PersistenceId,
        from: M::State,
        to: M::State,
        data: &M::Data,
        trigger: &FsmEvent<M::Event>,
    ) {
        info!(
            persistence_id = %persistence_id,
            from = %from,
            to = %to,
            trigger = %trigger,
            data = ?data,
            "state transition"
        );
    }

    fn on_stay(&self, persistence_id: &PersistenceId, state: M::State, trigger: &FsmEvent<M::Event>) {
        debug!(
            persistence_id = %persistence_id,
            state = %state,
            trigger = %trigger,
            "event ignored"
        );
    }

    fn on_unhandled(
        &self,
        persistence_id: &PersistenceId,
        state: M::State,
        trigger: &FsmEvent<M::Event>,
    ) {
        warn!(
            persistence_id = %persistence_id,
            state = %state,
            trigger = %trigger,
            "unhandled event"
        );
    }

    fn on_recovered(
        &self,
        persistence_id: &PersistenceId,
        state: M::State,
        data: &M::Data,
        sequence_nr: u64,
    ) {
        info!(
            persistence_id = %persistence_id,
            state = %state,
            sequence_nr,
            data = ?data,
            "instance recovered"
        );
    }

    fn on_fault(&self, persistence_id: &PersistenceId, state: M::State, reason: &str) {
        warn!(
            persistence_id = %persistence_id,
            state = %state,
            reason,
            "instance failed"
        );
    }
}
