//! # Application Layer
//!
//! The persistent FSM engine and the protocols built on it.
//!
//! - [`fsm`]: generic engine (model trait, transition tables, instances, registry)
//! - [`services`]: the RFQ negotiation protocol
//! - [`error`]: [`EngineError`](error::EngineError)

pub mod error;
pub mod fsm;
pub mod services;
