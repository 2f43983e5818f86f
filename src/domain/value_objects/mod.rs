//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Identity Types
//!
//! - [`PersistenceId`]: stable identity of one negotiation instance
//! - [`EventId`]: journal entry identifier
//!
//! ## Domain Types
//!
//! - [`RequestState`]: RFQ negotiation lifecycle states
//! - [`BidOffer`]: request side
//! - [`Price`]: quoted price with an unset sentinel
//! - [`Timestamp`]: UTC point in time

pub mod enums;
pub mod ids;
pub mod price;
pub mod request_state;
pub mod timestamp;

pub use enums::{BidOffer, ParseEnumError};
pub use ids::{EventId, PersistenceId};
pub use price::Price;
pub use request_state::{InvalidRequestStateError, RequestState};
pub use timestamp::Timestamp;
