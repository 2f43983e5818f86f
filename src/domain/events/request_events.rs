//! # Request Events
//!
//! The closed set of inputs a negotiation reacts to.
//!
//! Events fall in two classes:
//!
//! - **Domain events** ([`SubmitRequest`](RequestEvent::SubmitRequest),
//!   [`DealerAccept`](RequestEvent::DealerAccept),
//!   [`DealerCounter`](RequestEvent::DealerCounter)) are journaled and folded
//!   into [`RequestData`](crate::domain::entities::RequestData).
//! - **Control events** drive transitions only and carry no new data.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::domain::events::{EventClass, EventKind, RequestEvent};
//! use rfq_fsm::domain::value_objects::BidOffer;
//!
//! let submit = RequestEvent::submit_request("XS12345", BidOffer::Bid);
//! assert_eq!(submit.kind(), EventKind::SubmitRequest);
//! assert_eq!(submit.class(), EventClass::Domain);
//!
//! assert_eq!(RequestEvent::CustomerAccept.class(), EventClass::Control);
//! ```

use crate::domain::value_objects::{BidOffer, Price};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Whether an event is journaled and folded, or only drives transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventClass {
    /// Persisted and folded into data.
    Domain,
    /// Drives transitions only.
    Control,
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => write!(f, "DOMAIN"),
            Self::Control => write!(f, "CONTROL"),
        }
    }
}

/// An input to an RFQ negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestEvent {
    /// The client submits a request for an instrument and side.
    SubmitRequest {
        /// Instrument identifier.
        isin: String,
        /// Requested side.
        side: BidOffer,
    },

    /// The dealer quotes a firm price valid for `wiretime_secs`.
    DealerAccept {
        /// Quoted price.
        price: Price,
        /// Validity window of the firm quote, in seconds.
        wiretime_secs: u32,
    },

    /// The dealer counters a subject-accepted quote with a new price.
    DealerCounter {
        /// Countered price.
        price: Price,
    },

    /// The dealer rejects the request.
    DealerReject,

    /// The client accepts the current quote.
    CustomerAccept,

    /// The client rejects the current quote.
    CustomerReject,

    /// Fault injection: makes the handling instance fail.
    Crash,
}

impl RequestEvent {
    /// Creates a `SubmitRequest` event.
    #[must_use]
    pub fn submit_request(isin: impl Into<String>, side: BidOffer) -> Self {
        Self::SubmitRequest {
            isin: isin.into(),
            side,
        }
    }

    /// Creates a `DealerAccept` event.
    #[must_use]
    pub fn dealer_accept(price: f64, wiretime_secs: u32) -> Self {
        Self::DealerAccept {
            price: Price::new(price),
            wiretime_secs,
        }
    }

    /// Creates a `DealerCounter` event.
    #[must_use]
    pub fn dealer_counter(price: f64) -> Self {
        Self::DealerCounter {
            price: Price::new(price),
        }
    }

    /// Returns the payload-free tag of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::SubmitRequest { .. } => EventKind::SubmitRequest,
            Self::DealerAccept { .. } => EventKind::DealerAccept,
            Self::DealerCounter { .. } => EventKind::DealerCounter,
            Self::DealerReject => EventKind::DealerReject,
            Self::CustomerAccept => EventKind::CustomerAccept,
            Self::CustomerReject => EventKind::CustomerReject,
            Self::Crash => EventKind::Crash,
        }
    }

    /// Returns whether this event is a domain or a control event.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> EventClass {
        self.kind().class()
    }

    /// Returns true if this event is journaled and folded.
    #[inline]
    #[must_use]
    pub const fn is_domain_event(&self) -> bool {
        matches!(self.class(), EventClass::Domain)
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Returns the firm-quote validity window of a `DealerAccept`.
    #[must_use]
    pub fn wiretime(&self) -> Option<Duration> {
        match self {
            Self::DealerAccept { wiretime_secs, .. } => {
                Some(Duration::from_secs(u64::from(*wiretime_secs)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitRequest { isin, side } => write!(f, "SubmitRequest(isin={isin}, side={side})"),
            Self::DealerAccept {
                price,
                wiretime_secs,
            } => write!(f, "DealerAccept(price={price}, wiretime={wiretime_secs}s)"),
            Self::DealerCounter { price } => write!(f, "DealerCounter(price={price})"),
            other => f.write_str(other.event_name()),
        }
    }
}

/// Payload-free tag of a [`RequestEvent`], used to key transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// See [`RequestEvent::SubmitRequest`].
    SubmitRequest,
    /// See [`RequestEvent::DealerAccept`].
    DealerAccept,
    /// See [`RequestEvent::DealerCounter`].
    DealerCounter,
    /// See [`RequestEvent::DealerReject`].
    DealerReject,
    /// See [`RequestEvent::CustomerAccept`].
    CustomerAccept,
    /// See [`RequestEvent::CustomerReject`].
    CustomerReject,
    /// See [`RequestEvent::Crash`].
    Crash,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::SubmitRequest,
        Self::DealerAccept,
        Self::DealerCounter,
        Self::DealerReject,
        Self::CustomerAccept,
        Self::CustomerReject,
        Self::Crash,
    ];

    /// Returns the event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SubmitRequest => "SubmitRequest",
            Self::DealerAccept => "DealerAccept",
            Self::DealerCounter => "DealerCounter",
            Self::DealerReject => "DealerReject",
            Self::CustomerAccept => "CustomerAccept",
            Self::CustomerReject => "CustomerReject",
            Self::Crash => "Crash",
        }
    }

    /// Returns the class of events with this kind.
    #[must_use]
    pub const fn class(&self) -> EventClass {
        match self {
            Self::SubmitRequest | Self::DealerAccept | Self::DealerCounter => EventClass::Domain,
            Self::DealerReject | Self::CustomerAccept | Self::CustomerReject | Self::Crash => {
                EventClass::Control
            }
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod classification {
        use super::*;

        #[test]
        fn domain_events() {
            let domain: Vec<_> = EventKind::ALL
                .into_iter()
                .filter(|k| k.class() == EventClass::Domain)
                .collect();
            assert_eq!(
                domain,
                vec![
                    EventKind::SubmitRequest,
                    EventKind::DealerAccept,
                    EventKind::DealerCounter
                ]
            );
        }

        #[test]
        fn control_events_are_not_domain() {
            assert!(!RequestEvent::DealerReject.is_domain_event());
            assert!(!RequestEvent::Crash.is_domain_event());
            assert!(RequestEvent::dealer_counter(99.2).is_domain_event());
        }
    }

    mod accessors {
        use super::*;

        #[test]
        fn wiretime_only_on_dealer_accept() {
            assert_eq!(
                RequestEvent::dealer_accept(101.2, 3).wiretime(),
                Some(Duration::from_secs(3))
            );
            assert_eq!(RequestEvent::dealer_counter(99.2).wiretime(), None);
        }

        #[test]
        fn display_includes_payload() {
            let s = RequestEvent::submit_request("XS12345", BidOffer::Bid).to_string();
            assert!(s.contains("XS12345"));
            assert!(s.contains("BID"));
            assert_eq!(RequestEvent::CustomerAccept.to_string(), "CustomerAccept");
        }
    }

    mod serde {
        use super::*;

        #[test]
        fn tagged_representation() {
            let json = serde_json::to_value(RequestEvent::dealer_accept(101.2, 3)).unwrap();
            assert_eq!(json["type"], "DEALER_ACCEPT");
            assert_eq!(json["wiretime_secs"], 3);
        }

        #[test]
        fn unit_variants_deserialize() {
            let event: RequestEvent = serde_json::from_str(r#"{"type":"DEALER_REJECT"}"#).unwrap();
            assert_eq!(event, RequestEvent::DealerReject);
        }
    }
}
