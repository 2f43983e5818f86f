//! # Engine Context
//!
//! Everything an instance needs besides its own state: the shared
//! transition table, the event log, runtime settings and observers.

use super::model::FsmModel;
use super::observer::{TracingObserver, TransitionObserver};
use super::transition_table::TransitionTable;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence::EventLog;
use std::fmt;
use std::sync::Arc;

/// Shared dependencies of every instance of one model.
///
/// Cloning is cheap; all members are reference counted.
pub struct EngineContext<M: FsmModel> {
    table: Arc<TransitionTable<M>>,
    log: Arc<dyn EventLog>,
    config: EngineConfig,
    observers: Vec<Arc<dyn TransitionObserver<M>>>,
}

impl<M: FsmModel> EngineContext<M> {
    /// Creates a context with the [`TracingObserver`] installed.
    #[must_use]
    pub fn new(table: TransitionTable<M>, log: Arc<dyn EventLog>, config: EngineConfig) -> Self {
        Self {
            table: Arc::new(table),
            log,
            config,
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    /// Adds an observer. Observers are called in the order they were added.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn TransitionObserver<M>>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Removes every observer, including the default one.
    #[must_use]
    pub fn without_observers(mut self) -> Self {
        self.observers.clear();
        self
    }

    /// Returns the shared transition table.
    #[must_use]
    pub fn table(&self) -> &Arc<TransitionTable<M>> {
        &self.table
    }

    /// Returns the event log.
    #[must_use]
    pub fn log(&self) -> &dyn EventLog {
        self.log.as_ref()
    }

    /// Returns the runtime settings.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the observers.
    #[must_use]
    pub fn observers(&self) -> &[Arc<dyn TransitionObserver<M>>] {
        &self.observers
    }
}

impl<M: FsmModel> Clone for EngineContext<M> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            log: Arc::clone(&self.log),
            config: self.config.clone(),
            observers: self.observers.clone(),
        }
    }
}

impl<M: FsmModel> fmt::Debug for EngineContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("rules", &self.table.len())
            .field("log", &self.log)
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish()
    }
}
