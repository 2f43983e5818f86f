//! # Domain Enums
//!
//! Enumeration types for RFQ domain concepts.
//!
//! - [`BidOffer`] - Bid, Offer, or None (side not yet known)
//!
//! All enums implement `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
//! `Display`, `FromStr`, and Serde traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Side of a request for quote.
///
/// `None` is the placeholder carried by a request before the client has
/// submitted it.
///
/// # Examples
///
/// ```
/// use rfq_fsm::domain::value_objects::enums::BidOffer;
///
/// let side: BidOffer = "bid".parse().unwrap();
/// assert_eq!(side, BidOffer::Bid);
/// assert_eq!(side.opposite(), BidOffer::Offer);
/// assert_eq!(BidOffer::default(), BidOffer::None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum BidOffer {
    /// The client wants to buy.
    Bid = 0,
    /// The client wants to sell.
    Offer = 1,
    /// No side set yet.
    #[default]
    None = 2,
}

impl BidOffer {
    /// Returns the opposite side; `None` stays `None`.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Bid => Self::Offer,
            Self::Offer => Self::Bid,
            Self::None => Self::None,
        }
    }

    /// Returns true if a side has been chosen.
    #[inline]
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for BidOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "BID"),
            Self::Offer => write!(f, "OFFER"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// Error returned when parsing a domain enum from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseEnumError {
    /// The string did not name any variant.
    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

impl FromStr for BidOffer {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BID" | "BUY" => Ok(Self::Bid),
            "OFFER" | "SELL" => Ok(Self::Offer),
            "NONE" => Ok(Self::None),
            _ => Err(ParseEnumError::InvalidValue("BidOffer", s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Offer".parse::<BidOffer>().unwrap(), BidOffer::Offer);
        assert_eq!("SELL".parse::<BidOffer>().unwrap(), BidOffer::Offer);
        assert_eq!("none".parse::<BidOffer>().unwrap(), BidOffer::None);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "sideways".parse::<BidOffer>().unwrap_err();
        assert!(err.to_string().contains("BidOffer"));
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn display_and_serde_agree() {
        for side in [BidOffer::Bid, BidOffer::Offer, BidOffer::None] {
            let json = serde_json::to_string(&side).unwrap();
            assert_eq!(json, format!("\"{side}\""));
        }
    }

    #[test]
    fn opposite_and_is_set() {
        assert_eq!(BidOffer::Offer.opposite(), BidOffer::Bid);
        assert_eq!(BidOffer::None.opposite(), BidOffer::None);
        assert!(BidOffer::Bid.is_set());
        assert!(!BidOffer::None.is_set());
    }
}
