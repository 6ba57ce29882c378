//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! query_all(prompt, observer)
//!     → for every backend, concurrently:
//!         → pending event
//!         → limiter admission (bounded wait)
//!         → backend call, retried with backoff
//!         → success event (latency) | error event (message)
//!     → wait for all backends to settle
//!     → tagged items, backend declaration order
//! ```
//!
//! # Design Decisions
//! - One backend failing never cancels the others
//! - Total outage is an empty result, not an error; the events carry the causes
//! - Ranking belongs to the caller

pub mod fanout;
pub mod progress;
pub mod types;

pub use fanout::{Orchestrator, OrchestratorBuilder, QuerySettings};
pub use progress::{ProgressObserver, StatusLog};
pub use types::{
    ApiResponse, BackendState, OrchestratorError, QueryError, ResponseItem, StatusEvent,
};
