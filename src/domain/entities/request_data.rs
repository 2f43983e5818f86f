//! # Request Data
//!
//! Accumulated fields of an RFQ negotiation and the fold that builds them.
//!
//! [`RequestData`] is never mutated in place: [`RequestData::apply_event`]
//! returns a replacement value, and the current data of any instance equals
//! the left fold of its journaled domain events over
//! [`RequestData::default`].
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::domain::entities::RequestData;
//! use rfq_fsm::domain::events::RequestEvent;
//! use rfq_fsm::domain::value_objects::{BidOffer, Price};
//!
//! let data = RequestData::default()
//!     .apply_event(&RequestEvent::submit_request("XS12345", BidOffer::Bid))
//!     .unwrap()
//!     .apply_event(&RequestEvent::dealer_accept(101.20, 3))
//!     .unwrap();
//!
//! assert_eq!(data.isin(), "XS12345");
//! assert_eq!(data.side(), BidOffer::Bid);
//! assert_eq!(data.price(), Price::new(101.20));
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::RequestEvent;
use crate::domain::value_objects::{BidOffer, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data carried by an RFQ negotiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    /// Instrument identifier, empty until submitted.
    isin: String,
    /// Requested side, `None` until submitted.
    side: BidOffer,
    /// Latest dealer price, unset until quoted.
    price: Price,
}

impl RequestData {
    /// Creates request data from its parts (for reconstruction from storage).
    #[must_use]
    pub fn from_parts(isin: impl Into<String>, side: BidOffer, price: Price) -> Self {
        Self {
            isin: isin.into(),
            side,
            price,
        }
    }

    /// Returns the instrument identifier.
    #[inline]
    #[must_use]
    pub fn isin(&self) -> &str {
        &self.isin
    }

    /// Returns the requested side.
    #[inline]
    #[must_use]
    pub fn side(&self) -> BidOffer {
        self.side
    }

    /// Returns the latest dealer price.
    #[inline]
    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Folds one domain event into this data, returning the new data.
    ///
    /// - `SubmitRequest(isin, side)` starts fresh data with no price
    /// - `DealerAccept(price, _)` and `DealerCounter(price)` replace the price
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnhandledEvent`] for control events. They never
    /// reach the fold through a consistent transition table.
    pub fn apply_event(&self, event: &RequestEvent) -> DomainResult<Self> {
        match event {
            RequestEvent::SubmitRequest { isin, side } => {
                Ok(Self::from_parts(isin.clone(), *side, Price::UNSET))
            }
            RequestEvent::DealerAccept { price, .. } | RequestEvent::DealerCounter { price } => {
                Ok(Self::from_parts(self.isin.clone(), self.side, *price))
            }
            other => Err(DomainError::unhandled_event(other.event_name())),
        }
    }

    /// Folds a sequence of domain events starting from this data.
    ///
    /// # Errors
    ///
    /// Returns the first [`DomainError`] raised by [`apply_event`](Self::apply_event).
    pub fn replay<'a>(
        &self,
        events: impl IntoIterator<Item = &'a RequestEvent>,
    ) -> DomainResult<Self> {
        events
            .into_iter()
            .try_fold(self.clone(), |data, event| data.apply_event(event))
    }
}

impl fmt::Display for RequestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RequestData[isin={} side={} price={}]",
            self.isin, self.side, self.price
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn submitted() -> RequestData {
        RequestData::default()
            .apply_event(&RequestEvent::submit_request("XS12345", BidOffer::Bid))
            .unwrap()
    }

    mod fold {
        use super::*;

        #[test]
        fn default_is_blank() {
            let data = RequestData::default();
            assert_eq!(data.isin(), "");
            assert_eq!(data.side(), BidOffer::None);
            assert!(!data.price().is_set());
        }

        #[test]
        fn submit_request_sets_isin_and_side() {
            let data = submitted();
            assert_eq!(data.isin(), "XS12345");
            assert_eq!(data.side(), BidOffer::Bid);
            assert!(!data.price().is_set());
        }

        #[test]
        fn submit_request_clears_previous_price() {
            let quoted = submitted()
                .apply_event(&RequestEvent::dealer_accept(101.2, 3))
                .unwrap();
            let resubmitted = quoted
                .apply_event(&RequestEvent::submit_request("XS67890", BidOffer::Offer))
                .unwrap();
            assert_eq!(resubmitted.isin(), "XS67890");
            assert!(!resubmitted.price().is_set());
        }

        #[test]
        fn dealer_accept_carries_isin_and_side() {
            let data = submitted()
                .apply_event(&RequestEvent::dealer_accept(101.2, 3))
                .unwrap();
            assert_eq!(data.isin(), "XS12345");
            assert_eq!(data.side(), BidOffer::Bid);
            assert_eq!(data.price(), Price::new(101.2));
        }

        #[test]
        fn dealer_counter_replaces_price() {
            let data = submitted()
                .apply_event(&RequestEvent::dealer_accept(101.2, 3))
                .unwrap()
                .apply_event(&RequestEvent::dealer_counter(99.2))
                .unwrap();
            assert_eq!(data.price(), Price::new(99.2));
        }

        #[test]
        fn fold_does_not_touch_input() {
            let before = submitted();
            let _after = before
                .apply_event(&RequestEvent::dealer_counter(99.2))
                .unwrap();
            assert!(!before.price().is_set());
        }

        #[test]
        fn control_events_are_unhandled() {
            for event in [
                RequestEvent::DealerReject,
                RequestEvent::CustomerAccept,
                RequestEvent::CustomerReject,
                RequestEvent::Crash,
            ] {
                let err = submitted().apply_event(&event).unwrap_err();
                assert!(err.is_unhandled_event());
            }
        }
    }

    mod replay {
        use super::*;

        #[test]
        fn replay_equals_stepwise_fold() {
            let events = vec![
                RequestEvent::submit_request("XS12345", BidOffer::Offer),
                RequestEvent::dealer_accept(101.2, 3),
                RequestEvent::dealer_counter(99.2),
            ];
            let replayed = RequestData::default().replay(&events).unwrap();
            let stepwise = events
                .iter()
                .fold(RequestData::default(), |d, e| d.apply_event(e).unwrap());
            assert_eq!(replayed, stepwise);
        }

        #[test]
        fn replay_stops_at_first_error() {
            let events = vec![
                RequestEvent::submit_request("XS12345", BidOffer::Bid),
                RequestEvent::CustomerAccept,
            ];
            assert!(RequestData::default().replay(&events).is_err());
        }
    }

    #[test]
    fn serde_roundtrip_with_unset_price() {
        let data = submitted();
        let json = serde_json::to_string(&data).unwrap();
        let back: RequestData = serde_json::from_str(&json).unwrap();
        assert_eq!(data, back);
    }
}
