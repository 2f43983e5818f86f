//! # Domain Events
//!
//! Inputs of the RFQ negotiation.
//!
//! - [`RequestEvent`]: the closed set of client and dealer inputs
//! - [`EventKind`]: payload-free tag used to key transition rules
//! - [`EventClass`]: domain (journaled, folded) versus control

pub mod request_events;

pub use request_events::{EventClass, EventKind, RequestEvent};
