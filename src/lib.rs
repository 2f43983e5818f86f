//! # rfq-fsm
//!
//! Event-sourced persistent state machines, with a client/dealer
//! Request-for-Quote negotiation built on top.
//!
//! Every instance is identified by a persistence id, processes its events
//! one at a time, journals each transition before applying it and can be
//! rebuilt from its journal (plus an optional snapshot) after a crash.
//! States can carry a timeout that fires a synthetic event if nothing else
//! arrives first.
//!
//! # Architecture
//!
//! - [`domain`]: RFQ states, events, data and the data fold
//! - [`application`]: the generic FSM engine and the RFQ protocol
//! - [`infrastructure`]: event log adapters (in-memory, PostgreSQL) and
//!   configuration
//!
//! # Quick Start
//!
//! ```
//! use rfq_fsm::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let log = Arc::new(InMemoryEventLog::new());
//! let registry = RfqProtocol::registry(log, EngineConfig::default())?;
//! let id = PersistenceId::new("rfq-42");
//!
//! registry.handle(&id, RequestEvent::submit_request("XS12345", BidOffer::Bid)).await?;
//! let reaction = registry.handle(&id, RequestEvent::dealer_accept(101.20, 3)).await?;
//!
//! assert_eq!(reaction.to(), RequestState::QuoteFirm);
//! assert_eq!(reaction.data().price(), Price::new(101.20));
//!
//! registry.handle(&id, RequestEvent::CustomerAccept).await?;
//! assert_eq!(registry.current_state(&id).await?, RequestState::Done);
//! registry.stop_all().await;
//! # Ok::<(), EngineError>(())
//! # }).unwrap();
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

/// Commonly used types.
pub mod prelude {
    pub use crate::application::error::{EngineError, EngineResult};
    pub use crate::application::fsm::{
        EngineContext, EventMatcher, FsmEvent, FsmHandle, FsmModel, FsmRegistry, Outcome,
        Reaction, TracingObserver, TransitionObserver, TransitionTable,
    };
    pub use crate::application::services::{RfqHandle, RfqProtocol, RfqRegistry};
    pub use crate::domain::entities::RequestData;
    pub use crate::domain::events::{EventKind, RequestEvent};
    pub use crate::domain::value_objects::{BidOffer, PersistenceId, Price, RequestState};
    pub use crate::infrastructure::config::EngineConfig;
    pub use crate::infrastructure::persistence::in_memory::InMemoryEventLog;
    pub use crate::infrastructure::persistence::{EventLog, EventLogError, JournalEntry};
}
