//! # Infrastructure Layer
//!
//! Adapters around the engine: event log implementations and configuration.
//!
//! - [`persistence`]: [`EventLog`](persistence::EventLog) port, in-memory and
//!   PostgreSQL implementations
//! - [`config`]: [`EngineConfig`](config::EngineConfig)

pub mod config;
pub mod persistence;
