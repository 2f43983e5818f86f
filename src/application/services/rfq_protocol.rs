//! # RFQ Negotiation Protocol
//!
//! The client/dealer Request-for-Quote negotiation as a persistent FSM.
//!
//! # Negotiation Flow
//!
//! ```text
//! New --SubmitRequest--> Order --DealerAccept--> QuoteFirm --CustomerAccept--> Done
//!                          |                        |
//!                     DealerReject           wiretime expires
//!                          v                        v
//!                      Cancelled <--DealerReject-- QuoteSubjectAccepted <--CustomerAccept-- QuoteSubject
//!                                                   |                                         ^
//!                                                   +---------------DealerCounter-------------+
//! ```
//!
//! A firm quote is valid for the dealer's wiretime. If the client does not
//! accept it in time the quote becomes subject: the client may still accept,
//! after which the dealer can counter with a new price or reject.
//!
//! `QuoteFirm`, `QuoteSubject`, `QuoteSubjectAccepted` and `Done` ignore any
//! other event. `New`, `Order` and `Cancelled` report anything unexpected as
//! unhandled.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::application::services::RfqProtocol;
//! use rfq_fsm::domain::events::RequestEvent;
//! use rfq_fsm::domain::value_objects::{BidOffer, PersistenceId, RequestState};
//! use rfq_fsm::infrastructure::config::EngineConfig;
//! use rfq_fsm::infrastructure::persistence::in_memory::InMemoryEventLog;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let registry = RfqProtocol::registry(Arc::new(InMemoryEventLog::new()), EngineConfig::default())?;
//! let id = PersistenceId::new("rfq-1");
//!
//! registry.handle(&id, RequestEvent::submit_request("XS12345", BidOffer::Bid)).await?;
//! assert_eq!(registry.current_state(&id).await?, RequestState::Order);
//! # Ok::<(), rfq_fsm::application::error::EngineError>(())
//! # }).unwrap();
//! ```

use crate::application::error::EngineResult;
use crate::application::fsm::{
    EngineContext, EventMatcher, FsmEvent, FsmHandle, FsmModel, FsmRegistry, HandlerFault,
    HandlerResult, Outcome, Transition, TransitionTable,
};
use crate::domain::entities::RequestData;
use crate::domain::errors::DomainResult;
use crate::domain::events::{EventKind, RequestEvent};
use crate::domain::value_objects::RequestState;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::persistence::EventLog;
use std::sync::Arc;

use EventKind::{
    CustomerAccept, Crash, DealerAccept, DealerCounter, DealerReject, SubmitRequest,
};
use RequestState::{Cancelled, Done, New, Order, QuoteFirm, QuoteSubject, QuoteSubjectAccepted};

/// Registry of RFQ negotiations.
pub type RfqRegistry = FsmRegistry<RfqProtocol>;

/// Handle to one RFQ negotiation.
pub type RfqHandle = FsmHandle<RfqProtocol>;

/// Handler result for the RFQ protocol.
pub type RfqHandlerResult = HandlerResult<RfqProtocol>;

/// Reason carried by the fault raised on [`RequestEvent::Crash`].
pub const CRASH_REASON: &str = "BOOM !";

/// The RFQ negotiation model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RfqProtocol;

impl FsmModel for RfqProtocol {
    type State = RequestState;
    type Data = RequestData;
    type Event = RequestEvent;
    type Kind = EventKind;

    fn initial_state() -> RequestState {
        New
    }

    fn initial_data() -> RequestData {
        RequestData::default()
    }

    fn kind_of(event: &RequestEvent) -> EventKind {
        event.kind()
    }

    fn apply_event(event: &RequestEvent, data: &RequestData) -> DomainResult<RequestData> {
        data.apply_event(event)
    }
}

impl RfqProtocol {
    /// Builds the negotiation's transition table.
    ///
    /// # Errors
    ///
    /// Returns an error only if the rule list below is malformed.
    pub fn transition_table() -> EngineResult<TransitionTable<Self>> {
        TransitionTable::builder()
            .when(New, EventMatcher::Kind(SubmitRequest), "client submits a request", on_submit)
            .when(Order, EventMatcher::Kind(DealerAccept), "dealer quotes firm", on_dealer_accept)
            .when(Order, EventMatcher::Kind(DealerReject), "dealer rejects", |_, _| {
                Ok(goto(Cancelled).into())
            })
            .when(QuoteFirm, EventMatcher::StateTimeout, "wiretime expires", |_, _| {
                Ok(goto(QuoteSubject).into())
            })
            .when(QuoteFirm, EventMatcher::Kind(CustomerAccept), "client accepts firm quote", |_, _| {
                Ok(goto(Done).into())
            })
            .when(QuoteFirm, EventMatcher::Kind(Crash), "fault injection", |_, _| {
                Err(HandlerFault::new(CRASH_REASON))
            })
            .when(QuoteFirm, EventMatcher::Any, "ignore", ignore)
            .when(
                QuoteSubject,
                EventMatcher::Kind(CustomerAccept),
                "client accepts subject quote",
                |_, _| Ok(goto(QuoteSubjectAccepted).into()),
            )
            .when(QuoteSubject, EventMatcher::Any, "ignore", ignore)
            .when(QuoteSubjectAccepted, EventMatcher::Kind(DealerCounter), "dealer counters", on_counter)
            .when(
                QuoteSubjectAccepted,
                EventMatcher::Kind(DealerReject),
                "dealer rejects after acceptance",
                |_, _| Ok(goto(Cancelled).with_snapshot().into()),
            )
            .when(QuoteSubjectAccepted, EventMatcher::Any, "ignore", ignore)
            .when(Done, EventMatcher::Any, "ignore", ignore)
            .build()
    }

    /// Creates a context over `log` with the default observers.
    ///
    /// # Errors
    ///
    /// See [`transition_table`](Self::transition_table).
    pub fn context(log: Arc<dyn EventLog>, config: EngineConfig) -> EngineResult<EngineContext<Self>> {
        Ok(EngineContext::new(Self::transition_table()?, log, config))
    }

    /// Creates an empty registry over `log`.
    ///
    /// # Errors
    ///
    /// See [`transition_table`](Self::transition_table).
    pub fn registry(log: Arc<dyn EventLog>, config: EngineConfig) -> EngineResult<RfqRegistry> {
        Ok(FsmRegistry::new(Self::context(log, config)?))
    }
}

fn goto(target: RequestState) -> Transition<RfqProtocol> {
    Outcome::goto(target)
}

fn domain_event(trigger: &FsmEvent<RequestEvent>) -> Result<RequestEvent, HandlerFault> {
    trigger
        .as_event()
        .cloned()
        .ok_or_else(|| HandlerFault::new(format!("expected a request event, got {trigger}")))
}

fn on_submit(trigger: &FsmEvent<RequestEvent>, _: &RequestData) -> RfqHandlerResult {
    Ok(goto(Order).applying(domain_event(trigger)?).into())
}

fn on_dealer_accept(trigger: &FsmEvent<RequestEvent>, _: &RequestData) -> RfqHandlerResult {
    let accept = domain_event(trigger)?;
    let wiretime = accept
        .wiretime()
        .ok_or_else(|| HandlerFault::new(format!("{accept} carries no wiretime")))?;
    Ok(goto(QuoteFirm).applying(accept).for_max(wiretime).into())
}

fn on_counter(trigger: &FsmEvent<RequestEvent>, _: &RequestData) -> RfqHandlerResult {
    Ok(goto(QuoteSubject).applying(domain_event(trigger)?).into())
}

fn ignore(_: &FsmEvent<RequestEvent>, _: &RequestData) -> RfqHandlerResult {
    Ok(Outcome::stay())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::fsm::EventKey;
    use crate::domain::value_objects::{BidOffer, Price};
    use std::time::Duration;

    fn table() -> TransitionTable<RfqProtocol> {
        RfqProtocol::transition_table().unwrap()
    }

    fn run(state: RequestState, event: FsmEvent<RequestEvent>) -> Option<HandlerResult<RfqProtocol>> {
        let table = table();
        let key = crate::application::fsm::key_of::<RfqProtocol>(&event);
        table
            .rule_for(state, key)
            .map(|rule| rule.invoke(&event, &RequestData::default()))
    }

    mod routing {
        use super::*;

        #[test]
        fn table_builds() {
            assert_eq!(table().len(), 13);
        }

        #[test]
        fn submit_applies_event() {
            let submit = RequestEvent::submit_request("XS12345", BidOffer::Bid);
            let outcome = run(New, FsmEvent::Event(submit.clone())).unwrap().unwrap();
            let transition = outcome.transition().unwrap();
            assert_eq!(transition.target(), Order);
            assert_eq!(transition.applied_event(), Some(&submit));
            assert!(transition.timeout().is_none());
        }

        #[test]
        fn dealer_accept_applies_and_arms_wiretime() {
            let accept = RequestEvent::dealer_accept(101.20, 3);
            let outcome = run(Order, FsmEvent::Event(accept.clone())).unwrap().unwrap();
            let transition = outcome.transition().unwrap();
            assert_eq!(transition.target(), QuoteFirm);
            assert_eq!(transition.applied_event(), Some(&accept));
            assert_eq!(transition.timeout(), Some(Duration::from_secs(3)));
        }

        #[test]
        fn firm_quote_expires_to_subject() {
            let outcome = run(QuoteFirm, FsmEvent::StateTimeout).unwrap().unwrap();
            assert_eq!(outcome.transition().unwrap().target(), QuoteSubject);
        }

        #[test]
        fn late_reject_snapshots() {
            let outcome = run(QuoteSubjectAccepted, FsmEvent::Event(RequestEvent::DealerReject))
                .unwrap()
                .unwrap();
            let transition = outcome.transition().unwrap();
            assert_eq!(transition.target(), Cancelled);
            assert!(transition.snapshot_before());
        }

        #[test]
        fn early_reject_does_not_snapshot() {
            let outcome = run(Order, FsmEvent::Event(RequestEvent::DealerReject))
                .unwrap()
                .unwrap();
            assert!(!outcome.transition().unwrap().snapshot_before());
        }

        #[test]
        fn counter_applies_price() {
            let counter = RequestEvent::dealer_counter(99.20);
            let outcome = run(QuoteSubjectAccepted, FsmEvent::Event(counter))
                .unwrap()
                .unwrap();
            let transition = outcome.transition().unwrap();
            assert_eq!(transition.target(), QuoteSubject);
            let data = RfqProtocol::apply_event(transition.applied_event().unwrap(), &RequestData::default())
                .unwrap();
            assert_eq!(data.price(), Price::new(99.20));
        }

        #[test]
        fn crash_faults() {
            let fault = run(QuoteFirm, FsmEvent::Event(RequestEvent::Crash))
                .unwrap()
                .unwrap_err();
            assert_eq!(fault.reason(), CRASH_REASON);
        }
    }

    mod catch_all {
        use super::*;

        #[test]
        fn quote_and_done_states_ignore_strays() {
            for state in [QuoteFirm, QuoteSubject, QuoteSubjectAccepted, Done] {
                let outcome = run(state, FsmEvent::Event(RequestEvent::submit_request("X", BidOffer::Offer)))
                    .unwrap()
                    .unwrap();
                assert!(outcome.is_stay(), "{state} should stay");
            }
        }

        #[test]
        fn new_order_and_cancelled_have_no_catch_all() {
            let table = table();
            for state in [New, Order, Cancelled] {
                assert!(
                    table
                        .rule_for(state, EventKey::Kind(EventKind::CustomerAccept))
                        .is_none(),
                    "{state} should not handle CustomerAccept"
                );
            }
            assert!(table.is_final(Cancelled));
        }

        #[test]
        fn crash_outside_firm_quote_is_ignored_or_unhandled() {
            assert!(run(Order, FsmEvent::Event(RequestEvent::Crash)).is_none());
            let outcome = run(QuoteSubject, FsmEvent::Event(RequestEvent::Crash))
                .unwrap()
                .unwrap();
            assert!(outcome.is_stay());
        }
    }
}
