//! # Request State
//!
//! Lifecycle states of a client/dealer RFQ negotiation.
//!
//! # State Machine
//!
//! ```text
//! New ─SubmitRequest→ Order ─DealerAccept→ QuoteFirm ─CustomerAccept→ Done
//!                       │                     │
//!                       │               (wiretime expires)
//!                       │                     ↓
//!                  DealerReject         QuoteSubject ←─DealerCounter─┐
//!                       │                     │                      │
//!                       ↓               CustomerAccept               │
//!                   Cancelled ←─DealerReject─ QuoteSubjectAccepted ──┘
//! ```
//!
//! The transitions themselves live in the transition table; this module only
//! defines the closed set of states.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::domain::value_objects::request_state::RequestState;
//!
//! let state = RequestState::default();
//! assert_eq!(state, RequestState::New);
//! assert!(!state.is_terminal());
//! assert_eq!(RequestState::QuoteFirm.identifier(), "Quote Firm");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// RFQ negotiation state.
///
/// # Terminal States
///
/// - [`Done`](RequestState::Done): the client accepted a firm quote
/// - [`Cancelled`](RequestState::Cancelled): the dealer rejected the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RequestState {
    /// Freshly created, nothing submitted yet.
    #[default]
    New = 0,

    /// The client submitted a request; awaiting the dealer.
    Order = 1,

    /// The dealer quoted a firm price, valid for the wiretime.
    QuoteFirm = 2,

    /// The wiretime expired; the quote is subject to dealer confirmation.
    QuoteSubject = 3,

    /// The client accepted a subject quote; awaiting dealer confirmation.
    QuoteSubjectAccepted = 4,

    /// Deal done (terminal).
    Done = 5,

    /// Request cancelled by the dealer (terminal).
    Cancelled = 6,
}

impl RequestState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Order,
        Self::QuoteFirm,
        Self::QuoteSubject,
        Self::QuoteSubjectAccepted,
        Self::Done,
        Self::Cancelled,
    ];

    /// Returns the human-readable identifier of this state.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Order => "Order",
            Self::QuoteFirm => "Quote Firm",
            Self::QuoteSubject => "Quote Subject",
            Self::QuoteSubjectAccepted => "Quote Subject Accepted",
            Self::Done => "Done",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Returns true if this is a terminal state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Returns true if a dealer quote is live (firm or subject).
    #[inline]
    #[must_use]
    pub const fn is_quoted(&self) -> bool {
        matches!(
            self,
            Self::QuoteFirm | Self::QuoteSubject | Self::QuoteSubjectAccepted
        )
    }

    /// Returns the numeric value of this state.
    #[inline]
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Order => "ORDER",
            Self::QuoteFirm => "QUOTE_FIRM",
            Self::QuoteSubject => "QUOTE_SUBJECT",
            Self::QuoteSubjectAccepted => "QUOTE_SUBJECT_ACCEPTED",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Error returned when converting an invalid u8 to [`RequestState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRequestStateError(
    /// The invalid u8 value.
    pub u8,
);

impl fmt::Display for InvalidRequestStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request state value: {}", self.0)
    }
}

impl std::error::Error for InvalidRequestStateError {}

impl TryFrom<u8> for RequestState {
    type Error = InvalidRequestStateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::New),
            1 => Ok(Self::Order),
            2 => Ok(Self::QuoteFirm),
            3 => Ok(Self::QuoteSubject),
            4 => Ok(Self::QuoteSubjectAccepted),
            5 => Ok(Self::Done),
            6 => Ok(Self::Cancelled),
            _ => Err(InvalidRequestStateError(value)),
        }
    }
}
