//! # Handler Outcomes
//!
//! What a transition handler decides: stay, or go to a target state with
//! optional modifiers.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::application::fsm::Outcome;
//! use rfq_fsm::application::services::RfqProtocol;
//! use rfq_fsm::domain::events::RequestEvent;
//! use rfq_fsm::domain::value_objects::RequestState;
//! use std::time::Duration;
//!
//! let outcome: Outcome<RfqProtocol> = Outcome::<RfqProtocol>::goto(RequestState::QuoteFirm)
//!     .applying(RequestEvent::dealer_accept(101.25, 3))
//!     .for_max(Duration::from_secs(3))
//!     .into();
//!
//! let transition = outcome.transition().unwrap();
//! assert_eq!(transition.target(), RequestState::QuoteFirm);
//! assert_eq!(transition.timeout(), Some(Duration::from_secs(3)));
//! ```

use super::model::FsmModel;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A handler's decision.
pub enum Outcome<M: FsmModel> {
    /// Keep state, data and any running timer. Nothing is persisted.
    Stay,
    /// Move to a target state.
    GoTo(Transition<M>),
}

impl<M: FsmModel> Outcome<M> {
    /// Creates a stay outcome.
    #[must_use]
    pub fn stay() -> Self {
        Self::Stay
    }

    /// Starts building a transition to `target`.
    #[must_use]
    pub fn goto(target: M::State) -> Transition<M> {
        Transition::new(target)
    }

    /// Returns true if this outcome keeps the current state.
    #[must_use]
    pub fn is_stay(&self) -> bool {
        matches!(self, Self::Stay)
    }

    /// Returns the transition, if this outcome is one.
    #[must_use]
    pub fn transition(&self) -> Option<&Transition<M>> {
        match self {
            Self::Stay => None,
            Self::GoTo(transition) => Some(transition),
        }
    }
}

impl<M: FsmModel> From<Transition<M>> for Outcome<M> {
    fn from(transition: Transition<M>) -> Self {
        Self::GoTo(transition)
    }
}

impl<M: FsmModel> Clone for Outcome<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Stay => Self::Stay,
            Self::GoTo(transition) => Self::GoTo(transition.clone()),
        }
    }
}

impl<M: FsmModel> fmt::Debug for Outcome<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => f.write_str("Stay"),
            Self::GoTo(transition) => f.debug_tuple("GoTo").field(transition).finish(),
        }
    }
}

/// A move to a target state.
///
/// Modifiers:
///
/// - [`applying`](Self::applying): a domain event to journal and fold into data
/// - [`for_max`](Self::for_max): a timeout armed on entry to the target state
/// - [`with_snapshot`](Self::with_snapshot): snapshot the current state and
///   data before the transition is persisted
pub struct Transition<M: FsmModel> {
    target: M::State,
    applying: Option<M::Event>,
    timeout: Option<Duration>,
    snapshot_before: bool,
}

impl<M: FsmModel> Transition<M> {
    fn new(target: M::State) -> Self {
        Self {
            target,
            applying: None,
            timeout: None,
            snapshot_before: false,
        }
    }

    /// Journals `event` with this transition and folds it into data.
    #[must_use]
    pub fn applying(mut self, event: M::Event) -> Self {
        self.applying = Some(event);
        self
    }

    /// Arms a state timeout of `timeout` on entry to the target state.
    #[must_use]
    pub fn for_max(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Writes a snapshot of the pre-transition state before persisting.
    #[must_use]
    pub fn with_snapshot(mut self) -> Self {
        self.snapshot_before = true;
        self
    }

    /// Returns the target state.
    #[inline]
    #[must_use]
    pub fn target(&self) -> M::State {
        self.target
    }

    /// Returns the domain event to apply, if any.
    #[inline]
    #[must_use]
    pub fn applied_event(&self) -> Option<&M::Event> {
        self.applying.as_ref()
    }

    /// Returns the state timeout to arm, if any.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns true if a snapshot is written before the transition.
    #[inline]
    #[must_use]
    pub fn snapshot_before(&self) -> bool {
        self.snapshot_before
    }
}

impl<M: FsmModel> Clone for Transition<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            applying: self.applying.clone(),
            timeout: self.timeout,
            snapshot_before: self.snapshot_before,
        }
    }
}

impl<M: FsmModel> fmt::Debug for Transition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("applying", &self.applying)
            .field("timeout", &self.timeout)
            .field("snapshot_before", &self.snapshot_before)
            .finish()
    }
}

/// A failure raised by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct HandlerFault {
    reason: String,
}

impl HandlerFault {
    /// Creates a fault with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the fault reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Result of a transition handler.
pub type HandlerResult<M> = Result<Outcome<M>, HandlerFault>;
