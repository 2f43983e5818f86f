//! # PostgreSQL Persistence
//!
//! - [`PostgresEventLog`]: sqlx-backed journal and snapshot storage

pub mod event_log;

pub use event_log::PostgresEventLog;
