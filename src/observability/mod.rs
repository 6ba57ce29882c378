//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Limiter, retries, fan-out produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (backend, attempt, delay) rather than formatted strings
//! - Metrics are cheap and become no-ops without an installed recorder

pub mod logging;
pub mod metrics;
