//! # FSM Registry
//!
//! Routes events to instances by persistence id.
//!
//! Instances are started on first use: delivering an event to an unknown id
//! recovers it from the event log (an empty journal yields a fresh instance)
//! and then delivers the event. An instance that crashed stays registered
//! and answers [`EngineError::InstanceUnavailable`] until it is explicitly
//! restarted with [`FsmRegistry::start`].
//!
//! Uses [`DashMap`] for concurrent lookup. Starts are serialised per id, so
//! two callers never recover the same id twice while a slow recovery only
//! holds up callers of that id.

use super::context::EngineContext;
use super::instance::{FsmHandle, FsmInstance, Reaction};
use super::model::FsmModel;
use crate::application::error::{EngineError, EngineResult};
use crate::domain::value_objects::PersistenceId;
use dashmap::DashMap;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Registry of running instances of one model.
pub struct FsmRegistry<M: FsmModel> {
    context: EngineContext<M>,
    instances: DashMap<PersistenceId, FsmHandle<M>>,
    starting: DashMap<PersistenceId, Arc<Mutex<()>>>,
}

impl<M: FsmModel> FsmRegistry<M> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(context: EngineContext<M>) -> Self {
        Self {
            context,
            instances: DashMap::new(),
            starting: DashMap::new(),
        }
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &EngineContext<M> {
        &self.context
    }

    /// Returns the handle for `persistence_id`, starting it if needed.
    ///
    /// A running instance is returned as is. A missing or dead one is
    /// recovered from the event log.
    ///
    /// # Errors
    ///
    /// Returns the recovery error if the journal cannot be read or replayed.
    pub async fn start(&self, persistence_id: &PersistenceId) -> EngineResult<FsmHandle<M>> {
        if let Some(handle) = self.live(persistence_id) {
            return Ok(handle);
        }

        let gate = self.starting.entry(persistence_id.clone()).or_default().clone();
        let result = {
            let _guard = gate.lock().await;
            match self.live(persistence_id) {
                Some(handle) => Ok(handle),
                None => self.spawn(persistence_id).await,
            }
        };
        drop(gate);
        // Only the map holds the gate once no caller is waiting on it.
        self.starting
            .remove_if(persistence_id, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    async fn spawn(&self, persistence_id: &PersistenceId) -> EngineResult<FsmHandle<M>> {
        let handle = FsmInstance::spawn(persistence_id.clone(), self.context.clone()).await?;
        self.instances.insert(persistence_id.clone(), handle.clone());
        info!(persistence_id = %persistence_id, "instance started");
        Ok(handle)
    }

    /// Delivers `event` to `persistence_id`.
    ///
    /// Unknown ids are started first. A crashed instance is not restarted.
    ///
    /// # Errors
    ///
    /// See [`FsmHandle::handle`]; recovery errors are returned as is.
    pub async fn handle(
        &self,
        persistence_id: &PersistenceId,
        event: M::Event,
    ) -> EngineResult<Reaction<M>> {
        let handle = match self.get(persistence_id) {
            Some(handle) => handle,
            None => self.start(persistence_id).await?,
        };
        handle.handle(event).await
    }

    /// Returns the handle for `persistence_id`, alive or not.
    #[must_use]
    pub fn get(&self, persistence_id: &PersistenceId) -> Option<FsmHandle<M>> {
        self.instances
            .get(persistence_id)
            .map(|entry| entry.value().clone())
    }

    /// Returns the current state of a registered instance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceUnavailable`] if the id is unknown or
    /// its instance is not running.
    pub async fn current_state(&self, persistence_id: &PersistenceId) -> EngineResult<M::State> {
        self.registered(persistence_id)?.current_state().await
    }

    /// Returns the current data of a registered instance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceUnavailable`] if the id is unknown or
    /// its instance is not running.
    pub async fn current_data(&self, persistence_id: &PersistenceId) -> EngineResult<M::Data> {
        self.registered(persistence_id)?.current_data().await
    }

    /// Snapshots a registered instance.
    ///
    /// # Errors
    ///
    /// See [`FsmHandle::snapshot_now`].
    pub async fn snapshot_now(&self, persistence_id: &PersistenceId) -> EngineResult<u64> {
        self.registered(persistence_id)?.snapshot_now().await
    }

    /// Stops and unregisters an instance. Unknown ids are ignored.
    pub async fn stop(&self, persistence_id: &PersistenceId) {
        if let Some((_, handle)) = self.instances.remove(persistence_id) {
            handle.stop().await;
        }
    }

    /// Stops and unregisters every instance.
    pub async fn stop_all(&self) {
        let handles: Vec<FsmHandle<M>> = self
            .instances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.instances.clear();
        join_all(handles.iter().map(|handle| handle.stop())).await;
    }

    /// Returns the number of registered instances, alive or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if no instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns the ids of registered instances.
    #[must_use]
    pub fn persistence_ids(&self) -> Vec<PersistenceId> {
        self.instances.iter().map(|entry| entry.key().clone()).collect()
    }

    fn live(&self, persistence_id: &PersistenceId) -> Option<FsmHandle<M>> {
        self.get(persistence_id).filter(FsmHandle::is_alive)
    }

    fn registered(&self, persistence_id: &PersistenceId) -> EngineResult<FsmHandle<M>> {
        self.get(persistence_id)
            .ok_or_else(|| EngineError::instance_unavailable(persistence_id))
    }
}

impl<M: FsmModel> fmt::Debug for FsmRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmRegistry")
            .field("context", &self.context)
            .field("instances", &self.instances.len())
            .finish()
    }
}
