//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! POST /query          → handlers.rs → Orchestrator::query_all → response.rs (rank) → JSON
//! GET  /query/stream   → handlers.rs → websocket.rs (status frames, then result)
//! GET  /backends       → limiter snapshot per backend
//! GET  /health         → "ok"
//! ```

pub mod handlers;
pub mod response;
pub mod server;
pub mod websocket;

pub use response::{rank_by_confidence, BackendSummary, QueryRequest, QueryResponse};
pub use server::{AppState, HttpServer, X_REQUEST_ID};
