//! # FSM Model
//!
//! The type-level description of a persistent state machine.
//!
//! A model names its state, data, event and event-kind types, says where a
//! fresh instance starts, and folds domain events into data. Routing lives in
//! a [`TransitionTable`](super::TransitionTable) built separately.
//!
//! The engine never inspects states or data beyond equality, serialization
//! and display, so any closed enum can drive it.

use crate::domain::errors::DomainResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::Hash;

/// Type-level description of a persistent state machine.
///
/// # Examples
///
/// ```
/// use rfq_fsm::application::fsm::FsmModel;
/// use rfq_fsm::application::services::RfqProtocol;
/// use rfq_fsm::domain::events::{EventKind, RequestEvent};
/// use rfq_fsm::domain::value_objects::RequestState;
///
/// assert_eq!(RfqProtocol::initial_state(), RequestState::New);
/// assert_eq!(
///     RfqProtocol::kind_of(&RequestEvent::CustomerAccept),
///     EventKind::CustomerAccept
/// );
/// ```
pub trait FsmModel: Send + Sync + 'static {
    /// Closed set of states.
    type State: Copy
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Accumulated data, rebuilt by folding domain events.
    type Data: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Inputs delivered to an instance.
    type Event: Clone + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Payload-free tag of an event, used to key transition rules.
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// State of a freshly created instance.
    fn initial_state() -> Self::State;

    /// Data of a freshly created instance.
    fn initial_data() -> Self::Data;

    /// Returns the tag of `event`.
    fn kind_of(event: &Self::Event) -> Self::Kind;

    /// Folds one domain event into `data`.
    ///
    /// # Errors
    ///
    /// Returns a domain error if `event` is not a domain event.
    fn apply_event(event: &Self::Event, data: &Self::Data) -> DomainResult<Self::Data>;
}

/// An input as seen by the engine: a model event or a state timeout.
#[derive(Debug, Clone, PartialEq)]
pub enum FsmEvent<E> {
    /// A caller-delivered event.
    Event(E),
    /// The timeout armed by the last transition elapsed.
    StateTimeout,
}

impl<E> FsmEvent<E> {
    /// Returns the wrapped event, if any.
    #[must_use]
    pub fn as_event(&self) -> Option<&E> {
        match self {
            Self::Event(event) => Some(event),
            Self::StateTimeout => None,
        }
    }

    /// Returns true if this is a state timeout.
    #[inline]
    #[must_use]
    pub fn is_state_timeout(&self) -> bool {
        matches!(self, Self::StateTimeout)
    }
}

impl<E: fmt::Display> fmt::Display for FsmEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => write!(f, "{event}"),
            Self::StateTimeout => f.write_str("StateTimeout"),
        }
    }
}

/// The routing key of an [`FsmEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey<K> {
    /// Key of a model event.
    Kind(K),
    /// Key of a state timeout.
    StateTimeout,
}

impl<K: fmt::Display> fmt::Display for EventKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::StateTimeout => f.write_str("StateTimeout"),
        }
    }
}

/// Returns the routing key of `event` under model `M`.
#[must_use]
pub fn key_of<M: FsmModel>(event: &FsmEvent<M::Event>) -> EventKey<M::Kind> {
    match event {
        FsmEvent::Event(event) => EventKey::Kind(M::kind_of(event)),
        FsmEvent::StateTimeout => EventKey::StateTimeout,
    }
}
