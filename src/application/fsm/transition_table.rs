//! # Transition Table
//!
//! Ordered `(state, matcher) -> handler` rules, built once and shared by
//! every instance of a model.
//!
//! Lookup is first-match in insertion order. A catch-all rule
//! ([`EventMatcher::Any`]) therefore has to come after every specific rule
//! for the same state; [`TransitionTableBuilder::build`] rejects tables where
//! a rule can never be reached.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::application::fsm::{EventKey, EventMatcher, Outcome, TransitionTable};
//! use rfq_fsm::application::services::RfqProtocol;
//! use rfq_fsm::domain::events::EventKind;
//! use rfq_fsm::domain::value_objects::RequestState;
//!
//! let table = TransitionTable::<RfqProtocol>::builder()
//!     .when(
//!         RequestState::Order,
//!         EventMatcher::Kind(EventKind::DealerReject),
//!         "dealer rejects",
//!         |_, _| Ok(Outcome::<RfqProtocol>::goto(RequestState::Cancelled).into()),
//!     )
//!     .when(RequestState::Order, EventMatcher::Any, "ignore", |_, _| Ok(Outcome::stay()))
//!     .build()
//!     .unwrap();
//!
//! let rule = table
//!     .rule_for(RequestState::Order, EventKey::Kind(EventKind::DealerReject))
//!     .unwrap();
//! assert_eq!(rule.description(), "dealer rejects");
//! assert!(table.rule_for(RequestState::Done, EventKey::StateTimeout).is_none());
//! ```

use super::model::{EventKey, FsmEvent, FsmModel};
use super::outcome::HandlerResult;
use crate::application::error::{EngineError, EngineResult};
use std::collections::HashSet;
use std::fmt;

/// A transition handler.
///
/// Receives the triggering event and the current data; returns the outcome
/// or a fault. Handlers must not perform I/O.
pub type Handler<M> =
    fn(&FsmEvent<<M as FsmModel>::Event>, &<M as FsmModel>::Data) -> HandlerResult<M>;

/// Which events a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventMatcher<K> {
    /// Events of one kind.
    Kind(K),
    /// The state timeout.
    StateTimeout,
    /// Any event, including the state timeout.
    Any,
}

impl<K: Copy + Eq> EventMatcher<K> {
    /// Returns true if this matcher accepts `key`.
    #[must_use]
    pub fn matches(&self, key: EventKey<K>) -> bool {
        match (self, key) {
            (Self::Any, _) => true,
            (Self::StateTimeout, EventKey::StateTimeout) => true,
            (Self::Kind(expected), EventKey::Kind(actual)) => *expected == actual,
            _ => false,
        }
    }

    /// Returns true if this is the catch-all matcher.
    #[inline]
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl<K: fmt::Display> fmt::Display for EventMatcher<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::StateTimeout => f.write_str("StateTimeout"),
            Self::Any => f.write_str("*"),
        }
    }
}

/// One row of a transition table.
pub struct Rule<M: FsmModel> {
    state: M::State,
    matcher: EventMatcher<M::Kind>,
    description: &'static str,
    handler: Handler<M>,
}

impl<M: FsmModel> Rule<M> {
    /// Returns the state this rule applies in.
    #[inline]
    #[must_use]
    pub fn state(&self) -> M::State {
        self.state
    }

    /// Returns the event matcher.
    #[inline]
    #[must_use]
    pub fn matcher(&self) -> EventMatcher<M::Kind> {
        self.matcher
    }

    /// Returns the human-readable description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Runs the handler.
    pub fn invoke(&self, event: &FsmEvent<M::Event>, data: &M::Data) -> HandlerResult<M> {
        (self.handler)(event, data)
    }

    fn matches(&self, state: M::State, key: EventKey<M::Kind>) -> bool {
        self.state == state && self.matcher.matches(key)
    }
}

impl<M: FsmModel> fmt::Debug for Rule<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("state", &self.state)
            .field("matcher", &self.matcher)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// An immutable, validated transition table.
pub struct TransitionTable<M: FsmModel> {
    rules: Vec<Rule<M>>,
}

impl<M: FsmModel> TransitionTable<M> {
    /// Starts a new table.
    #[must_use]
    pub fn builder() -> TransitionTableBuilder<M> {
        TransitionTableBuilder { rules: Vec::new() }
    }

    /// Returns the first rule matching `state` and `key`.
    #[must_use]
    pub fn rule_for(&self, state: M::State, key: EventKey<M::Kind>) -> Option<&Rule<M>> {
        self.rules.iter().find(|rule| rule.matches(state, key))
    }

    /// Returns every rule in lookup order.
    #[must_use]
    pub fn rules(&self) -> &[Rule<M>] {
        &self.rules
    }

    /// Returns the rules for one state, in lookup order.
    pub fn rules_in(&self, state: M::State) -> impl Iterator<Item = &Rule<M>> {
        self.rules.iter().filter(move |rule| rule.state == state)
    }

    /// Returns true if no rule applies in `state`.
    #[must_use]
    pub fn is_final(&self, state: M::State) -> bool {
        self.rules_in(state).next().is_none()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<M: FsmModel> fmt::Debug for TransitionTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("rules", &self.rules)
            .finish()
    }
}

/// Builder for [`TransitionTable`].
pub struct TransitionTableBuilder<M: FsmModel> {
    rules: Vec<Rule<M>>,
}

impl<M: FsmModel> TransitionTableBuilder<M> {
    /// Adds a rule. Rules are matched in the order they are added.
    #[must_use]
    pub fn when(
        mut self,
        state: M::State,
        matcher: EventMatcher<M::Kind>,
        description: &'static str,
        handler: Handler<M>,
    ) -> Self {
        self.rules.push(Rule {
            state,
            matcher,
            description,
            handler,
        });
        self
    }

    /// Validates and freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransitionTable`] if a `(state, matcher)`
    /// pair appears twice or a rule follows a catch-all for the same state.
    pub fn build(self) -> EngineResult<TransitionTable<M>> {
        let mut seen = HashSet::new();
        let mut catch_all = HashSet::new();

        for rule in &self.rules {
            if catch_all.contains(&rule.state) {
                return Err(EngineError::invalid_table(format!(
                    "rule '{}' ({} on {}) is shadowed by an earlier catch-all",
                    rule.description, rule.state, rule.matcher
                )));
            }
            if !seen.insert((rule.state, rule.matcher)) {
                return Err(EngineError::invalid_table(format!(
                    "duplicate rule for {} on {}",
                    rule.state, rule.matcher
                )));
            }
            if rule.matcher.is_catch_all() {
                catch_all.insert(rule.state);
            }
        }

        Ok(TransitionTable { rules: self.rules })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::fsm::Outcome;
    use crate::application::services::RfqProtocol;
    use crate::domain::entities::RequestData;
    use crate::domain::events::{EventKind, RequestEvent};
    use crate::domain::value_objects::RequestState;

    fn stay(_: &FsmEvent<RequestEvent>, _: &RequestData) -> HandlerResult<RfqProtocol> {
        Ok(Outcome::stay())
    }

    fn cancel(_: &FsmEvent<RequestEvent>, _: &RequestData) -> HandlerResult<RfqProtocol> {
        Ok(Outcome::<RfqProtocol>::goto(RequestState::Cancelled).into())
    }

    mod matcher {
        use super::*;

        #[test]
        fn kind_matches_only_its_kind() {
            let m = EventMatcher::Kind(EventKind::Crash);
            assert!(m.matches(EventKey::Kind(EventKind::Crash)));
            assert!(!m.matches(EventKey::Kind(EventKind::DealerReject)));
            assert!(!m.matches(EventKey::StateTimeout));
        }

        #[test]
        fn any_matches_timeout() {
            assert!(EventMatcher::<EventKind>::Any.matches(EventKey::StateTimeout));
            assert!(EventMatcher::<EventKind>::StateTimeout.matches(EventKey::StateTimeout));
        }
    }

    mod build {
        use super::*;

        #[test]
        fn first_match_wins() {
            let table = TransitionTable::<RfqProtocol>::builder()
                .when(RequestState::Order, EventMatcher::Kind(EventKind::DealerReject), "reject", cancel)
                .when(RequestState::Order, EventMatcher::Any, "ignore", stay)
                .build()
                .unwrap();

            let rule = table
                .rule_for(RequestState::Order, EventKey::Kind(EventKind::DealerReject))
                .unwrap();
            assert_eq!(rule.description(), "reject");

            let rule = table
                .rule_for(RequestState::Order, EventKey::Kind(EventKind::CustomerAccept))
                .unwrap();
            assert_eq!(rule.description(), "ignore");
            assert_eq!(table.len(), 2);
        }

        #[test]
        fn rejects_duplicate() {
            let err = TransitionTable::<RfqProtocol>::builder()
                .when(RequestState::New, EventMatcher::Kind(EventKind::Crash), "a", stay)
                .when(RequestState::New, EventMatcher::Kind(EventKind::Crash), "b", stay)
                .build()
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidTransitionTable(_)));
        }

        #[test]
        fn rejects_rule_after_catch_all() {
            let err = TransitionTable::<RfqProtocol>::builder()
                .when(RequestState::QuoteFirm, EventMatcher::Any, "ignore", stay)
                .when(RequestState::QuoteFirm, EventMatcher::StateTimeout, "expire", cancel)
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("expire"));
        }

        #[test]
        fn catch_all_is_per_state() {
            let table = TransitionTable::<RfqProtocol>::builder()
                .when(RequestState::QuoteFirm, EventMatcher::Any, "ignore", stay)
                .when(RequestState::Order, EventMatcher::Kind(EventKind::DealerReject), "reject", cancel)
                .build()
                .unwrap();
            assert!(table.is_final(RequestState::Done));
            assert!(!table.is_final(RequestState::Order));
            assert_eq!(table.rules_in(RequestState::QuoteFirm).count(), 1);
        }
    }
}
