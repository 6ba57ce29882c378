//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FanoutConfig (validated, immutable)
//!     → orchestrator / server built from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a change means a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::FanoutConfig;
pub use schema::BackendConfig;
pub use schema::ObservabilityConfig;
pub use schema::QueryConfig;
pub use schema::ServerConfig;
pub use schema::SimulationConfig;
