//! # Application Services
//!
//! Protocols implemented on top of the persistent FSM engine.
//!
//! - [`RfqProtocol`]: client/dealer Request-for-Quote negotiation

pub mod rfq_protocol;

pub use rfq_protocol::{CRASH_REASON, RfqHandle, RfqHandlerResult, RfqProtocol, RfqRegistry};
