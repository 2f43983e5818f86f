//! # Domain Entities
//!
//! - [`RequestData`]: the data an RFQ negotiation accumulates, and its fold

pub mod request_data;

pub use request_data::RequestData;
