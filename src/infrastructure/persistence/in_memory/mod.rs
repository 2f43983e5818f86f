//! # In-Memory Persistence
//!
//! In-memory implementations for testing without database dependencies.
//!
//! - [`InMemoryEventLog`]: journal and snapshot storage
//!
//! ## Thread Safety
//!
//! Storage is shared through `Arc<RwLock<HashMap>>`; clones see the same data.

pub mod event_log;

pub use event_log::InMemoryEventLog;
