//! # Domain Layer
//!
//! RFQ negotiation states, events, and data. Nothing in this layer knows
//! about persistence, timers, or the async runtime.
//!
//! - [`entities`]: [`RequestData`](entities::RequestData) and its fold
//! - [`events`]: [`RequestEvent`](events::RequestEvent) and its kinds
//! - [`value_objects`]: states, sides, prices, identifiers
//! - [`errors`]: [`DomainError`](errors::DomainError)

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;
