//! # Price Value Object
//!
//! Quoted price with a quiet-NaN "unset" sentinel.
//!
//! A request carries no price until the dealer quotes one. The unset value is
//! stored as NaN in memory and as `null` on the wire, because JSON cannot
//! represent NaN.
//!
//! # Examples
//!
//! ```
//! use rfq_fsm::domain::value_objects::Price;
//!
//! let unset = Price::UNSET;
//! assert!(!unset.is_set());
//! assert_eq!(unset, Price::default());
//!
//! let quoted = Price::new(101.20);
//! assert_eq!(quoted.value(), Some(101.20));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A quoted price, or the unset sentinel.
///
/// Equality treats two unset prices as equal so that replayed data can be
/// compared with live data.
#[derive(Debug, Clone, Copy)]
pub struct Price(f64);

impl Price {
    /// The "no price yet" sentinel.
    pub const UNSET: Self = Self(f64::NAN);

    /// Creates a price from a raw value. A NaN input yields [`Price::UNSET`].
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns true if a price has been quoted.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.0.is_nan()
    }

    /// Returns the quoted value, or `None` if unset.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.is_set().then_some(self.0)
    }

    /// Returns the raw value, NaN when unset.
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> f64 {
        self.0
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::UNSET
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{v:.2}"),
            None => write!(f, "NaN"),
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<f64>::deserialize(deserializer)?;
        Ok(value.map_or(Self::UNSET, Self::new))
    }
}
