//! # Persistent FSM Engine
//!
//! A generic, event-sourced finite state machine runtime.
//!
//! A model ([`FsmModel`]) names its states, data and events and folds domain
//! events into data. A [`TransitionTable`] maps `(state, event)` pairs to
//! handlers that return an [`Outcome`]. Each instance runs as its own task
//! ([`FsmInstance`]), journals every transition to an
//! [`EventLog`](crate::infrastructure::persistence::EventLog) before applying
//! it, and rebuilds itself from the journal when restarted. The
//! [`FsmRegistry`] routes events to instances by persistence id.
//!
//! - [`model`]: model trait and engine-level events
//! - [`outcome`]: handler results and transition modifiers
//! - [`transition_table`]: rules, matchers and validation
//! - [`machine`]: synchronous core (decide, plan, commit, recover)
//! - [`timer`]: per-instance state timeout
//! - [`observer`]: lifecycle hooks
//! - [`context`]: dependencies shared by instances
//! - [`instance`]: instance task and handle
//! - [`registry`]: routing by persistence id

pub mod context;
pub mod instance;
pub mod machine;
pub mod model;
pub mod observer;
pub mod outcome;
pub mod registry;
pub mod timer;
pub mod transition_table;

pub use context::EngineContext;
pub use instance::{FsmHandle, FsmInstance, InstanceStatus, Reaction};
pub use machine::{PersistentFsm, PlannedStep};
pub use model::{EventKey, FsmEvent, FsmModel, key_of};
pub use observer::{TracingObserver, TransitionObserver};
pub use outcome::{HandlerFault, HandlerResult, Outcome, Transition};
pub use registry::FsmRegistry;
pub use timer::StateTimer;
pub use transition_table::{EventMatcher, Handler, Rule, TransitionTable, TransitionTableBuilder};
