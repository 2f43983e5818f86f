//! # Persistence Layer
//!
//! The event log port and its implementations.
//!
//! ## Port
//!
//! - [`EventLog`]: per-instance journal plus snapshots
//!
//! ## Implementations
//!
//! - `in_memory`: in-memory log for tests and the demo driver
//! - `postgres`: PostgreSQL log backed by sqlx

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use traits::{EventLog, EventLogError, EventLogResult, JournalEntry, SnapshotRecord};
