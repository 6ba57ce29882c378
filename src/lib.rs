//! Prompt fan-out across rate-limited model backends.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod orchestrator;
pub mod resilience;

pub use config::FanoutConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use limiter::{LimiterError, RateLimiter};
pub use orchestrator::{Orchestrator, ProgressObserver, ResponseItem, StatusEvent};
